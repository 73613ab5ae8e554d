//! Cross-file X-axis synchronization
//!
//! Computes one additive X offset per file so that a chosen feature of each
//! file's master channel lines up at zero:
//!
//! - **XMin** - the smallest X sample
//! - **XMax** - the largest X sample
//! - **YThreshold** - the first point where Y reaches a threshold,
//!   interpolated linearly between the straddling samples
//!
//! Per-file problems (no master channel, threshold never crossed) are
//! reported as warning strings and leave that file's offset at zero; they
//! never abort the batch. Channel data is never modified; offsets are applied
//! at render time.

use crate::cancel::{CancelToken, Progress};
use crate::types::{CurveChannel, FileId, ImportedFile};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

/// Reference feature used for synchronization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    #[default]
    Off,
    XMin,
    XMax,
    YThreshold,
}

impl SyncMode {
    /// Get display name
    pub fn display_name(&self) -> &'static str {
        match self {
            SyncMode::Off => "Off",
            SyncMode::XMin => "X minimum",
            SyncMode::XMax => "X maximum",
            SyncMode::YThreshold => "Y threshold",
        }
    }

    /// Get all modes
    pub fn all() -> &'static [SyncMode] {
        &[
            SyncMode::Off,
            SyncMode::XMin,
            SyncMode::XMax,
            SyncMode::YThreshold,
        ]
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SyncMode::Off => "off",
            SyncMode::XMin => "xmin",
            SyncMode::XMax => "xmax",
            SyncMode::YThreshold => "ythreshold",
        };
        f.write_str(s)
    }
}

impl FromStr for SyncMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "off" => Ok(SyncMode::Off),
            "xmin" => Ok(SyncMode::XMin),
            "xmax" => Ok(SyncMode::XMax),
            "ythreshold" => Ok(SyncMode::YThreshold),
            other => Err(format!("unknown sync mode '{}'", other)),
        }
    }
}

/// Parameters of one synchronization run
#[derive(Debug, Clone, PartialEq)]
pub struct SyncRequest {
    pub mode: SyncMode,
    /// Y axis name (or channel description) identifying the master channel
    pub master_axis: String,
    /// X axis the plot currently uses
    pub active_x_axis: String,
    /// Only used by [`SyncMode::YThreshold`]
    pub threshold: f64,
}

/// Result of a synchronization run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncOutcome {
    pub offsets: HashMap<FileId, f64>,
    /// One human readable warning per failed file
    pub errors: Vec<String>,
    /// The run was cancelled; `offsets` holds the files finished before that
    pub cancelled: bool,
}

/// Why a single file could not be synchronized
#[derive(Debug, Clone, PartialEq)]
enum FileSyncError {
    MasterNotFound,
    NoPoints,
    ThresholdNotCrossed,
}

/// First channel on the active X axis whose Y axis name or description
/// equals `master_axis`
pub fn find_master_channel<'a>(
    file: &'a ImportedFile,
    master_axis: &str,
    active_x_axis: &str,
) -> Option<&'a CurveChannel> {
    file.channels
        .iter()
        .find(|c| c.matches_axes(active_x_axis, master_axis))
}

/// X position where `ys` first reaches `threshold`.
///
/// An exact hit returns that sample's X; a strict sign change between two
/// consecutive samples is interpolated linearly.
pub fn find_threshold_crossing(xs: &[f64], ys: &[f64], threshold: f64) -> Option<f64> {
    let n = xs.len().min(ys.len());
    for i in 0..n {
        let y0 = ys[i];
        if y0 == threshold {
            return Some(xs[i]);
        }
        if i + 1 < n {
            let y1 = ys[i + 1];
            if (y0 < threshold && y1 > threshold) || (y0 > threshold && y1 < threshold) {
                let (x0, x1) = (xs[i], xs[i + 1]);
                return Some(x0 + ((threshold - y0) / (y1 - y0)) * (x1 - x0));
            }
        }
    }
    None
}

fn offset_for_channel(
    channel: &CurveChannel,
    mode: SyncMode,
    threshold: f64,
) -> Result<f64, FileSyncError> {
    if channel.points_x.is_empty() {
        return Err(FileSyncError::NoPoints);
    }
    match mode {
        SyncMode::Off => Ok(0.0),
        SyncMode::XMin => Ok(-channel
            .points_x
            .iter()
            .copied()
            .fold(f64::INFINITY, f64::min)),
        SyncMode::XMax => Ok(-channel
            .points_x
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max)),
        SyncMode::YThreshold => {
            find_threshold_crossing(&channel.points_x, &channel.points_y, threshold)
                .map(|x| -x)
                .ok_or(FileSyncError::ThresholdNotCrossed)
        }
    }
}

/// Compute per-file X offsets.
///
/// `on_progress` is called before each file. Cancellation is checked between
/// files; offsets computed before cancellation are returned as-is.
pub fn compute_sync_offsets(
    files: &[ImportedFile],
    request: &SyncRequest,
    mut on_progress: impl FnMut(Progress),
    cancel: &CancelToken,
) -> SyncOutcome {
    let mut outcome = SyncOutcome::default();
    if request.mode == SyncMode::Off {
        return outcome;
    }

    let total = files.len();
    for (index, file) in files.iter().enumerate() {
        if cancel.is_cancelled() {
            tracing::info!("Sync cancelled after {} of {} files", index, total);
            outcome.cancelled = true;
            break;
        }
        on_progress(Progress {
            current: index + 1,
            total,
            label: file.filename.clone(),
        });

        let result = find_master_channel(file, &request.master_axis, &request.active_x_axis)
            .ok_or(FileSyncError::MasterNotFound)
            .and_then(|channel| offset_for_channel(channel, request.mode, request.threshold));

        let offset = match result {
            Ok(offset) => offset,
            Err(err) => {
                let message = match err {
                    FileSyncError::MasterNotFound => format!(
                        "{}: master channel '{}' not found on X axis '{}'",
                        file.filename, request.master_axis, request.active_x_axis
                    ),
                    FileSyncError::NoPoints => format!(
                        "{}: master channel '{}' has no points",
                        file.filename, request.master_axis
                    ),
                    FileSyncError::ThresholdNotCrossed => format!(
                        "{}: threshold {} not crossed by '{}'",
                        file.filename, request.threshold, request.master_axis
                    ),
                };
                tracing::warn!("{}", message);
                outcome.errors.push(message);
                0.0
            }
        };
        outcome.offsets.insert(file.id.clone(), offset);
    }

    outcome
}

/// Y axis names present in every file, sorted.
///
/// Threshold synchronization should only offer these as master axes.
pub fn common_y_axes(files: &[ImportedFile]) -> Vec<String> {
    let mut iter = files.iter().map(|f| f.y_axis_names());
    let Some(first) = iter.next() else {
        return Vec::new();
    };
    iter.fold(first, |acc: BTreeSet<String>, names| {
        acc.intersection(&names).cloned().collect()
    })
    .into_iter()
    .collect()
}

/// Synchronization settings and the offsets of the last applied run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncState {
    pub mode: SyncMode,
    pub master_axis: String,
    pub threshold: f64,
    #[serde(skip)]
    offsets: HashMap<FileId, f64>,
}

impl SyncState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a request for the given X axis from the current settings
    pub fn request(&self, active_x_axis: impl Into<String>) -> SyncRequest {
        SyncRequest {
            mode: self.mode,
            master_axis: self.master_axis.clone(),
            active_x_axis: active_x_axis.into(),
            threshold: self.threshold,
        }
    }

    /// Replace all offsets with the result of a run
    pub fn apply(&mut self, outcome: &SyncOutcome) {
        self.offsets = outcome.offsets.clone();
    }

    /// Drop every offset
    pub fn reset(&mut self) {
        self.offsets.clear();
    }

    /// Offset of a file, zero when none was computed
    pub fn offset_for(&self, file_id: &FileId) -> f64 {
        self.offsets.get(file_id).copied().unwrap_or(0.0)
    }

    pub fn offsets(&self) -> &HashMap<FileId, f64> {
        &self.offsets
    }

    pub fn is_active(&self) -> bool {
        !self.offsets.is_empty()
    }

    /// Forget the offset of a removed file
    pub fn remove_file(&mut self, file_id: &FileId) {
        self.offsets.remove(file_id);
    }
}

/// X values shifted by `offset`
pub fn shift_x(xs: &[f64], offset: f64) -> Vec<f64> {
    xs.iter().map(|x| x + offset).collect()
}
