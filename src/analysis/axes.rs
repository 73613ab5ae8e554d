//! Axis aggregation across channels
//!
//! Plot ranges come from the channels' declared [`CoordSystem`] bounds, not
//! from scanning their points: a configured measurement window may be wider
//! than the sampled range and the plot should show all of it.
//!
//! [`CoordSystem`]: crate::types::CoordSystem

use crate::types::{CurveChannel, FileId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Combined coordinate range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisRange {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl Default for AxisRange {
    /// Degenerate `[0,1]×[0,1]` range used when nothing is plotted
    fn default() -> Self {
        Self {
            min_x: 0.0,
            max_x: 1.0,
            min_y: 0.0,
            max_y: 1.0,
        }
    }
}

impl AxisRange {
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Same range translated along X
    pub fn shifted_x(&self, offset: f64) -> Self {
        Self {
            min_x: self.min_x + offset,
            max_x: self.max_x + offset,
            ..*self
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct RangeAccumulator {
    min_x: f64,
    max_x: f64,
    min_y: f64,
    max_y: f64,
}

impl RangeAccumulator {
    fn new() -> Self {
        Self {
            min_x: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            min_y: f64::INFINITY,
            max_y: f64::NEG_INFINITY,
        }
    }

    fn push(&mut self, channel: &CurveChannel, offset: f64) {
        let cs = &channel.coord_system;
        if cs.min_x.is_finite() {
            self.min_x = self.min_x.min(cs.min_x + offset);
        }
        if cs.max_x.is_finite() {
            self.max_x = self.max_x.max(cs.max_x + offset);
        }
        if cs.min_y.is_finite() {
            self.min_y = self.min_y.min(cs.min_y);
        }
        if cs.max_y.is_finite() {
            self.max_y = self.max_y.max(cs.max_y);
        }
    }

    /// Each side falls back to the default independently
    fn finish(self) -> AxisRange {
        let default = AxisRange::default();
        let pick = |v: f64, fallback: f64| if v.is_finite() { v } else { fallback };
        AxisRange {
            min_x: pick(self.min_x, default.min_x),
            max_x: pick(self.max_x, default.max_x),
            min_y: pick(self.min_y, default.min_y),
            max_y: pick(self.max_y, default.max_y),
        }
    }
}

/// Union of the declared bounds of `channels`; `[0,1]×[0,1]` when empty
pub fn aggregate_ranges<'a>(channels: impl IntoIterator<Item = &'a CurveChannel>) -> AxisRange {
    let mut acc = RangeAccumulator::new();
    for channel in channels {
        acc.push(channel, 0.0);
    }
    acc.finish()
}

/// Like [`aggregate_ranges`], with each channel's X bounds shifted by its
/// file's sync offset (missing offsets count as zero)
pub fn aggregate_ranges_with_offsets<'a>(
    channels: impl IntoIterator<Item = &'a CurveChannel>,
    offset_for: impl Fn(&FileId) -> f64,
) -> AxisRange {
    let mut acc = RangeAccumulator::new();
    for channel in channels {
        acc.push(channel, offset_for(&channel.file_id));
    }
    acc.finish()
}

/// Distinct non-empty X axis names, sorted
pub fn x_axis_names<'a>(channels: impl IntoIterator<Item = &'a CurveChannel>) -> Vec<String> {
    channels
        .into_iter()
        .map(|c| c.x_axis.name.as_str())
        .filter(|n| !n.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Distinct non-empty Y axis names, sorted
pub fn y_axis_names<'a>(channels: impl IntoIterator<Item = &'a CurveChannel>) -> Vec<String> {
    channels
        .into_iter()
        .map(|c| c.y_axis.name.as_str())
        .filter(|n| !n.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Channels sharing one Y axis, with their combined range
#[derive(Debug, Clone)]
pub struct YAxisGroup<'a> {
    pub name: String,
    /// Unit of the first channel on this axis
    pub unit: String,
    pub channels: Vec<&'a CurveChannel>,
    pub range: AxisRange,
}

/// Split channels into one group per Y axis name, sorted by name.
///
/// Channels without a Y axis name are grouped under their description.
pub fn y_axis_layout<'a>(channels: impl IntoIterator<Item = &'a CurveChannel>) -> Vec<YAxisGroup<'a>> {
    let mut by_axis: BTreeMap<String, Vec<&'a CurveChannel>> = BTreeMap::new();
    for channel in channels {
        let key = if channel.y_axis.name.is_empty() {
            channel.description.clone()
        } else {
            channel.y_axis.name.clone()
        };
        by_axis.entry(key).or_default().push(channel);
    }

    by_axis
        .into_iter()
        .map(|(name, channels)| YAxisGroup {
            unit: channels
                .first()
                .map(|c| c.y_axis.unit.clone())
                .unwrap_or_default(),
            range: aggregate_ranges(channels.iter().copied()),
            name,
            channels,
        })
        .collect()
}
