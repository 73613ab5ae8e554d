//! Core data types for curvescope
//!
//! This module contains the in-memory curve model produced by the parser and
//! consumed by the analysis and view layers.
//!
//! # Main Types
//!
//! - [`ImportedFile`] - Aggregate root: header, channels and value tables of one file
//! - [`HeaderInfo`] - Per-file metadata (machine, measuring point, flags, date)
//! - [`CurveChannel`] - One measured X/Y series with axes, style and annotations
//! - [`GraphicElements`] - Line, window and circle overlays attached to a channel
//! - [`ValueRow`] - One row of the set-value or actual-value table
//!
//! # Ownership
//!
//! A file owns its channels and a channel owns its points and overlays.
//! Nothing in the crate mutates a channel after parsing; render-time
//! adjustments such as sync offsets produce shifted copies instead.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Legacy status code for "OK" before normalization
pub const RAW_STATUS_OK: i64 = 0;
/// Legacy status code for "deactivated" before normalization
pub const RAW_STATUS_DEACTIVATED: i64 = 1;
/// Legacy status code for "NOK" before normalization
pub const RAW_STATUS_NOK: i64 = 2;

/// Row is deactivated and excluded from unions, histograms and trends
pub const STATUS_DEACTIVATED: i64 = 256;
/// Row is informative only
pub const STATUS_INFORMATIVE: i64 = 500;
/// Row is within tolerance
pub const STATUS_OK: i64 = 501;
/// Row is out of tolerance
pub const STATUS_NOK: i64 = 502;
/// Row violated its lower limit
pub const STATUS_LOWER_LIMIT: i64 = 503;
/// Row violated its upper limit
pub const STATUS_UPPER_LIMIT: i64 = 504;

/// Default background color for value cells (0xFFFFFF)
pub const DEFAULT_BACKGROUND_COLOR: u32 = 16_777_215;
/// Default text color for value cells
pub const DEFAULT_TEXT_COLOR: u32 = 0;

/// Normalize a raw status code from the document.
///
/// Legacy codes 0/1/2 map onto 501/256/502. Every other value, including the
/// extended 500..=504 range, passes through unchanged.
pub fn map_value_status(raw: i64) -> i64 {
    match raw {
        RAW_STATUS_OK => STATUS_OK,
        RAW_STATUS_DEACTIVATED => STATUS_DEACTIVATED,
        RAW_STATUS_NOK => STATUS_NOK,
        other => other,
    }
}

/// Typed view of a normalized status code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueStatus {
    Deactivated,
    Informative,
    Ok,
    Nok,
    LowerLimitViolation,
    UpperLimitViolation,
    Other(i64),
}

impl ValueStatus {
    /// Interpret a normalized status code
    pub fn from_code(code: i64) -> Self {
        match code {
            STATUS_DEACTIVATED => ValueStatus::Deactivated,
            STATUS_INFORMATIVE => ValueStatus::Informative,
            STATUS_OK => ValueStatus::Ok,
            STATUS_NOK => ValueStatus::Nok,
            STATUS_LOWER_LIMIT => ValueStatus::LowerLimitViolation,
            STATUS_UPPER_LIMIT => ValueStatus::UpperLimitViolation,
            other => ValueStatus::Other(other),
        }
    }

    /// Get display name
    pub fn display_name(&self) -> &'static str {
        match self {
            ValueStatus::Deactivated => "Deactivated",
            ValueStatus::Informative => "Informative",
            ValueStatus::Ok => "OK",
            ValueStatus::Nok => "NOK",
            ValueStatus::LowerLimitViolation => "Lower limit violated",
            ValueStatus::UpperLimitViolation => "Upper limit violated",
            ValueStatus::Other(_) => "Unknown",
        }
    }
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

string_id!(
    /// Identifier of an imported file, unique per import session
    FileId
);
string_id!(
    /// Identifier of a channel, unique per import session
    ChannelId
);
string_id!(
    /// Identifier of a user-defined channel group
    GroupId
);

/// Per-file metadata taken from the document header
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeaderInfo {
    pub machine_description: String,
    pub module_description: String,
    pub measuring_point: String,
    pub ident_string: String,
    pub type_name: String,
    pub variant: String,
    /// OK/NOK classification is enabled for this measurement
    pub ok_nok_enabled: bool,
    /// The measurement was classified NOK
    pub marked_as_nok: bool,
    /// The machine flagged the recorded data as possibly incorrect
    pub data_possibly_incorrect: bool,
    pub title: String,
    /// Date exactly as written in the file
    pub date: String,
}

/// Date layouts seen in measurement headers, tried in order
const HEADER_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
];

impl HeaderInfo {
    /// Best-effort interpretation of the raw date string.
    ///
    /// The raw string is never rewritten; this is only used for ordering files
    /// in trend views.
    pub fn parsed_date(&self) -> Option<NaiveDateTime> {
        let raw = self.date.trim();
        if raw.is_empty() {
            return None;
        }
        if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
            return Some(dt.naive_local());
        }
        HEADER_DATE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
    }
}

/// Name, unit and display precision of one axis
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AxisInfo {
    pub name: String,
    pub unit: String,
    pub precision: i32,
}

impl AxisInfo {
    /// Axis label including the unit, e.g. `Force [kN]`
    pub fn label(&self) -> String {
        if self.unit.is_empty() {
            self.name.clone()
        } else {
            format!("{} [{}]", self.name, self.unit)
        }
    }
}

/// Declared coordinate system of a channel.
///
/// These bounds come from the file and are independent of the sampled data;
/// they may be wider than the actual point range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CoordSystem {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
    pub origin_x: f64,
    pub origin_y: f64,
}

/// Drawing style shared by all items of one graphic element group
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementStyle {
    /// Packed RGB color
    pub color: u32,
    pub thickness: f64,
    pub line_style: i32,
    pub fill: bool,
    pub fill_color: u32,
}

/// A group of graphic elements with its own description and style
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementGroup<T> {
    pub description: String,
    pub style: ElementStyle,
    pub items: Vec<T>,
}

impl<T> ElementGroup<T> {
    fn map_items(&self, f: impl Fn(&T) -> T) -> Self {
        Self {
            description: self.description.clone(),
            style: self.style.clone(),
            items: self.items.iter().map(f).collect(),
        }
    }
}

/// Straight segment annotation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineElement {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub description: String,
    /// Drawing order hint, neither contiguous nor unique
    pub layer: Option<i32>,
}

/// Axis-aligned rectangle defined by two arbitrary corners
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowElement {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub description: String,
    pub layer: Option<i32>,
}

impl WindowElement {
    /// Normalized `(min_x, min_y, max_x, max_y)` regardless of corner order
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        (
            self.x1.min(self.x2),
            self.y1.min(self.y2),
            self.x1.max(self.x2),
            self.y1.max(self.y2),
        )
    }

    /// Whether a point lies inside the window, edges included
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let (min_x, min_y, max_x, max_y) = self.bounds();
        (min_x..=max_x).contains(&x) && (min_y..=max_y).contains(&y)
    }
}

/// Circle annotation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CircleElement {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    pub description: String,
    pub layer: Option<i32>,
}

/// All annotation overlays attached to a channel
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphicElements {
    pub line_groups: Vec<ElementGroup<LineElement>>,
    pub window_groups: Vec<ElementGroup<WindowElement>>,
    pub circle_groups: Vec<ElementGroup<CircleElement>>,
}

impl GraphicElements {
    pub fn is_empty(&self) -> bool {
        self.line_groups.is_empty() && self.window_groups.is_empty() && self.circle_groups.is_empty()
    }

    /// Copy with every X coordinate translated by `offset`
    pub fn shifted_x(&self, offset: f64) -> Self {
        if offset == 0.0 {
            return self.clone();
        }
        Self {
            line_groups: self
                .line_groups
                .iter()
                .map(|g| {
                    g.map_items(|l| LineElement {
                        x1: l.x1 + offset,
                        x2: l.x2 + offset,
                        ..l.clone()
                    })
                })
                .collect(),
            window_groups: self
                .window_groups
                .iter()
                .map(|g| {
                    g.map_items(|w| WindowElement {
                        x1: w.x1 + offset,
                        x2: w.x2 + offset,
                        ..w.clone()
                    })
                })
                .collect(),
            circle_groups: self
                .circle_groups
                .iter()
                .map(|g| {
                    g.map_items(|c| CircleElement {
                        x: c.x + offset,
                        ..c.clone()
                    })
                })
                .collect(),
        }
    }
}

/// One measured series with its metadata and annotations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurveChannel {
    pub id: ChannelId,
    pub file_id: FileId,
    pub description: String,
    pub group_description: String,
    pub x_axis: AxisInfo,
    pub y_axis: AxisInfo,
    /// Present in the format but unused for 2-D plotting
    pub z_axis: AxisInfo,
    /// Packed RGB color
    pub color: u32,
    pub line_style: i32,
    pub line_thickness: f64,
    pub is_line_visible: bool,
    pub is_point_visible: bool,
    pub coord_system: CoordSystem,
    pub points_x: Vec<f64>,
    pub points_y: Vec<f64>,
    pub graphics: GraphicElements,
}

impl CurveChannel {
    /// Number of samples; `points_x` and `points_y` always have this length
    pub fn no_of_points(&self) -> usize {
        self.points_x.len()
    }

    /// Data points as `[x, y]` pairs
    pub fn plot_points(&self) -> Vec<[f64; 2]> {
        self.points_x
            .iter()
            .zip(self.points_y.iter())
            .map(|(&x, &y)| [x, y])
            .collect()
    }

    /// Whether this channel is plotted on the given X/Y axis pair.
    ///
    /// The Y identity also matches on the channel description, since older
    /// files leave the Y axis name empty and use the description instead.
    pub fn matches_axes(&self, x_axis: &str, y_axis: &str) -> bool {
        self.x_axis.name == x_axis && (self.y_axis.name == y_axis || self.description == y_axis)
    }
}

/// One row of the set-value or actual-value table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueRow {
    pub description: String,
    /// Cross-file join key; not unique within a single file
    pub row_number: i64,
    /// Raw text; numeric interpretation is left to consumers
    pub value: String,
    pub unit: String,
    pub precision: i32,
    /// Normalized status code, see [`map_value_status`]
    pub status: i64,
    pub description_text_color: u32,
    pub description_background_color: u32,
    pub unit_text_color: u32,
    pub unit_background_color: u32,
    pub value_text_color: u32,
    pub value_background_color: u32,
}

impl Default for ValueRow {
    fn default() -> Self {
        Self {
            description: String::new(),
            row_number: 0,
            value: String::new(),
            unit: String::new(),
            precision: 0,
            status: STATUS_OK,
            description_text_color: DEFAULT_TEXT_COLOR,
            description_background_color: DEFAULT_BACKGROUND_COLOR,
            unit_text_color: DEFAULT_TEXT_COLOR,
            unit_background_color: DEFAULT_BACKGROUND_COLOR,
            value_text_color: DEFAULT_TEXT_COLOR,
            value_background_color: DEFAULT_BACKGROUND_COLOR,
        }
    }
}

impl ValueRow {
    pub fn is_deactivated(&self) -> bool {
        self.status == STATUS_DEACTIVATED
    }

    pub fn status(&self) -> ValueStatus {
        ValueStatus::from_code(self.status)
    }

    /// Parse the value text as a finite number
    pub fn numeric_value(&self) -> Option<f64> {
        self.value
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
    }
}

/// Everything parsed from one measurement file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportedFile {
    pub id: FileId,
    pub filename: String,
    pub header: HeaderInfo,
    pub channels: Vec<CurveChannel>,
    pub set_values: Vec<ValueRow>,
    pub actual_values: Vec<ValueRow>,
}

impl ImportedFile {
    /// Look up a channel by id
    pub fn channel(&self, id: &ChannelId) -> Option<&CurveChannel> {
        self.channels.iter().find(|c| &c.id == id)
    }

    /// Distinct X axis names used by this file's channels
    pub fn x_axis_names(&self) -> BTreeSet<String> {
        self.channels
            .iter()
            .map(|c| c.x_axis.name.clone())
            .filter(|n| !n.is_empty())
            .collect()
    }

    /// Distinct Y axis names used by this file's channels
    pub fn y_axis_names(&self) -> BTreeSet<String> {
        self.channels
            .iter()
            .map(|c| c.y_axis.name.clone())
            .filter(|n| !n.is_empty())
            .collect()
    }

    /// Total number of samples across all channels
    pub fn total_points(&self) -> usize {
        self.channels.iter().map(|c| c.no_of_points()).sum()
    }
}
