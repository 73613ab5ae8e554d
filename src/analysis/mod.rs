//! Numeric analysis over imported curves and value rows
//!
//! - [`axes`] - Plot range aggregation and axis names
//! - [`lttb`] - Display downsampling
//! - [`sync`] - Per-file X offsets
//! - [`stats`] - Statistics, histograms, correlation kernels
//! - [`values`] - Cross-file set/actual value rows

pub mod axes;
pub mod lttb;
pub mod stats;
pub mod sync;
pub mod values;

pub use axes::{aggregate_ranges, aggregate_ranges_with_offsets, y_axis_layout, AxisRange, YAxisGroup};
pub use lttb::{downsample, downsample_points};
pub use stats::{
    compute_histogram, compute_stats, linear_regression, pearson_r, HistogramBin, Regression,
    Stats,
};
pub use sync::{compute_sync_offsets, common_y_axes, SyncMode, SyncOutcome, SyncRequest, SyncState};
pub use values::{
    collect_value_rows, correlate, row_trends, value_series, Correlation, TrendBatch, TrendPoint,
    ValueKind, ValueRowKey,
};
