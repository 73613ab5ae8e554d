//! Configuration module for curvescope
//!
//! Settings live in a single TOML file. Every section is optional, so a file
//! containing only `[plot]` is valid and the rest falls back to defaults.
//!
//! # Default Location
//!
//! - **Linux**: `~/.config/curvescope/config.toml`
//! - **macOS**: `~/Library/Application Support/curvescope/config.toml`
//! - **Windows**: `%APPDATA%\curvescope\config.toml`
//!
//! # Example
//!
//! ```ignore
//! use curvescope::config::AppConfig;
//!
//! let config = AppConfig::load_or_default(None);
//! let pool = ImportPool::new(&config.import);
//! ```

use crate::analysis::stats::{DEFAULT_LABEL_PRECISION, MAX_BINS, MIN_BINS};
use crate::analysis::sync::SyncMode;
use crate::error::{CurveError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application directory name under the platform config dir
pub const APP_DIR: &str = "curvescope";

/// Config filename
pub const CONFIG_FILE: &str = "config.toml";

/// Default number of cores left free for the caller
pub const DEFAULT_WORKER_HEADROOM: usize = 1;

/// Default number of files per import sub-batch
pub const DEFAULT_SUB_BATCH_SIZE: usize = 8;

/// Default maximum number of points drawn per channel
pub const DEFAULT_DOWNSAMPLE_THRESHOLD: usize = 2000;

/// Default histogram bin count
pub const DEFAULT_HISTOGRAM_BINS: usize = 10;

/// Get the default config file path
pub fn default_config_path() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_DIR).join(CONFIG_FILE))
}

// ==================== Sections ====================

/// File import settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Cores kept free when sizing the worker pool
    pub worker_headroom: usize,
    /// Hard cap on worker threads
    pub max_workers: Option<usize>,
    /// Files handed to a worker at once
    pub sub_batch_size: usize,
    /// Extensions picked up by directory scans (case-insensitive)
    pub extensions: Vec<String>,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            worker_headroom: DEFAULT_WORKER_HEADROOM,
            max_workers: None,
            sub_batch_size: DEFAULT_SUB_BATCH_SIZE,
            extensions: vec!["xml".to_string(), "zip".to_string()],
        }
    }
}

impl ImportConfig {
    /// Number of worker threads for this machine.
    ///
    /// Available parallelism minus the headroom, at least one, then capped
    /// by `max_workers`.
    pub fn worker_count(&self) -> usize {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        self.worker_count_for(cores)
    }

    pub fn worker_count_for(&self, cores: usize) -> usize {
        let count = cores.saturating_sub(self.worker_headroom).max(1);
        match self.max_workers {
            Some(cap) => count.min(cap.max(1)),
            None => count,
        }
    }

    /// Sub-batch size, never zero
    pub fn effective_sub_batch_size(&self) -> usize {
        self.sub_batch_size.max(1)
    }
}

/// Plot rendering settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotConfig {
    pub downsample_enabled: bool,
    /// Maximum number of points drawn per channel
    pub downsample_threshold: usize,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            downsample_enabled: true,
            downsample_threshold: DEFAULT_DOWNSAMPLE_THRESHOLD,
        }
    }
}

impl PlotConfig {
    /// Threshold to pass to the downsampler; `None` draws every point
    pub fn threshold(&self) -> Option<usize> {
        self.downsample_enabled.then_some(self.downsample_threshold)
    }
}

/// Statistics settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub histogram_bins: usize,
    /// Significant digits in histogram labels
    pub label_precision: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            histogram_bins: DEFAULT_HISTOGRAM_BINS,
            label_precision: DEFAULT_LABEL_PRECISION,
        }
    }
}

impl AnalysisConfig {
    pub fn bins(&self) -> usize {
        self.histogram_bins.clamp(MIN_BINS, MAX_BINS)
    }
}

/// Initial synchronization settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub mode: SyncMode,
    pub threshold: f64,
}

/// Log output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Directory for daily rolling log files; console only when unset
    pub directory: Option<PathBuf>,
    pub file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: None,
            file_prefix: "curvescope.log".to_string(),
        }
    }
}

// ==================== App Config ====================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub import: ImportConfig,
    pub plot: PlotConfig,
    pub analysis: AnalysisConfig,
    pub sync: SyncConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load config from `path`, or the default location when `None`.
    ///
    /// A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => default_config_path().ok_or_else(|| {
                CurveError::Config("Could not determine config directory".to_string())
            })?,
        };

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .map_err(|e| CurveError::Config(format!("Failed to read {}: {}", path.display(), e)))?;

        Self::from_toml(&content)
    }

    /// Load config, returning defaults on any error
    pub fn load_or_default(path: Option<&Path>) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| CurveError::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| CurveError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Save config to `path`, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    CurveError::Config(format!("Failed to create config directory: {}", e))
                })?;
            }
        }

        let content = self.to_toml()?;
        std::fs::write(path, content)
            .map_err(|e| CurveError::Config(format!("Failed to write config: {}", e)))
    }
}
