//! # curvescope: measurement curve import and analysis
//!
//! Loads XML measurement files (optionally zipped) describing X/Y curves with
//! graphic annotations and set/actual value tables, and provides the analysis
//! a plotting front end needs on top of them.
//!
//! ## Architecture
//!
//! - **Parser**: XML (or zip) bytes to [`ImportedFile`], with tolerant
//!   handling of the document dialects seen in the field
//! - **Import**: Worker pool with sub-batching, progress messages and
//!   cooperative cancellation
//! - **Analysis**: Axis aggregation, LTTB downsampling, cross-file X sync,
//!   statistics and value-row correlation
//! - **View**: Groups, sparse per-instance visibility and render series
//! - **Communication**: Crossbeam channels between the import workers and
//!   the caller
//!
//! ## Configuration
//!
//! Settings are read from `config.toml` in the platform config directory
//! under `curvescope/`, see [`config`].
//!
//! ## Example
//!
//! ```ignore
//! use curvescope::{
//!     analysis::sync::{compute_sync_offsets, SyncMode, SyncRequest},
//!     cancel::CancelToken,
//!     config::AppConfig,
//!     import::{scan_directory, ImportPool},
//! };
//!
//! let config = AppConfig::load_or_default(None);
//! let pool = ImportPool::new(&config.import);
//! let paths = scan_directory(dir, &config.import.extensions)?;
//! let report = pool.submit(paths, CancelToken::new()).wait();
//!
//! let request = SyncRequest {
//!     mode: SyncMode::XMin,
//!     master_axis: "Force".into(),
//!     active_x_axis: "Distance".into(),
//!     threshold: 0.0,
//! };
//! let outcome = compute_sync_offsets(&report.files, &request, |_| {}, &CancelToken::new());
//! ```

pub mod analysis;
pub mod cancel;
pub mod config;
pub mod error;
pub mod import;
pub mod parser;
pub mod types;
pub mod view;

// Re-export commonly used types
pub use cancel::{CancelToken, Progress};
pub use config::AppConfig;
pub use error::{CurveError, Result};
pub use import::{ImportPool, ImportReport};
pub use types::{CurveChannel, FileId, ImportedFile, ValueRow};
