//! File import orchestration
//!
//! Parsing independent files is the only parallel work in the crate. The
//! [`ImportPool`] spreads sub-batches over worker threads and reports back
//! through crossbeam channels, in the same command/message style as the rest
//! of the crate's threading.
//!
//! # Components
//!
//! - [`ImportPool`] - Worker threads fed from a FIFO job queue
//! - [`ImportHandle`] - Caller-side receiver for one submitted request
//! - [`ImportMessage`] - Messages sent from workers to the caller
//! - [`loader`] - Directory scanning, single-file loading, sequential import
//!
//! # Example
//!
//! ```ignore
//! use curvescope::import::{scan_directory, ImportPool};
//!
//! let pool = ImportPool::new(&config.import);
//! let paths = scan_directory(dir, &config.import.extensions)?;
//! let handle = pool.submit(paths, CancelToken::new());
//!
//! for msg in handle.iter() {
//!     match msg {
//!         ImportMessage::Progress { completed, total, .. } => { /* update a progress bar */ }
//!         ImportMessage::Finished { .. } => break,
//!     }
//! }
//! ```

pub mod loader;
pub mod pool;

pub use loader::{expand_paths, import_sequential, load_file, scan_directory};
pub use pool::ImportPool;

use crate::cancel::CancelToken;
use crate::types::ImportedFile;
use crossbeam_channel::Receiver;
use std::path::PathBuf;

/// A file that could not be imported
#[derive(Debug, Clone, PartialEq)]
pub struct SkipEntry {
    pub path: PathBuf,
    pub reason: String,
}

/// Message sent from the import workers to the caller
#[derive(Debug)]
pub enum ImportMessage {
    /// One sub-batch was processed
    Progress {
        request_id: u64,
        results: Vec<ImportedFile>,
        skipped: Vec<SkipEntry>,
        /// Files processed so far across the whole request
        completed: usize,
        total: usize,
    },
    /// Every sub-batch was processed or dropped
    Finished { request_id: u64, cancelled: bool },
}

/// Everything a request produced
#[derive(Debug, Default)]
pub struct ImportReport {
    pub files: Vec<ImportedFile>,
    pub skipped: Vec<SkipEntry>,
    pub submitted: usize,
    /// Some files were never attempted because the request was cancelled
    pub cancelled: bool,
}

impl ImportReport {
    /// Files neither imported nor skipped
    pub fn unprocessed(&self) -> usize {
        self.submitted
            .saturating_sub(self.files.len() + self.skipped.len())
    }
}

/// Caller-side handle of one import request
pub struct ImportHandle {
    request_id: u64,
    submitted: usize,
    receiver: Receiver<ImportMessage>,
    cancel: CancelToken,
}

impl ImportHandle {
    pub(crate) fn new(
        request_id: u64,
        submitted: usize,
        receiver: Receiver<ImportMessage>,
        cancel: CancelToken,
    ) -> Self {
        Self {
            request_id,
            submitted,
            receiver,
            cancel,
        }
    }

    pub fn request_id(&self) -> u64 {
        self.request_id
    }

    /// Stop queued sub-batches of this request from starting
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Try to receive a message without blocking
    pub fn try_recv(&self) -> Option<ImportMessage> {
        self.receiver.try_recv().ok()
    }

    /// Receive all pending messages
    pub fn drain(&self) -> Vec<ImportMessage> {
        let mut messages = Vec::new();
        while let Ok(msg) = self.receiver.try_recv() {
            messages.push(msg);
        }
        messages
    }

    /// Blocking iterator over incoming messages
    pub fn iter(&self) -> crossbeam_channel::Iter<'_, ImportMessage> {
        self.receiver.iter()
    }

    /// Block until the request finishes and collect its results
    pub fn wait(self) -> ImportReport {
        let mut report = ImportReport {
            submitted: self.submitted,
            ..Default::default()
        };
        for msg in self.receiver.iter() {
            match msg {
                ImportMessage::Progress {
                    results, skipped, ..
                } => {
                    report.files.extend(results);
                    report.skipped.extend(skipped);
                }
                ImportMessage::Finished { cancelled, .. } => {
                    report.cancelled = cancelled;
                    break;
                }
            }
        }
        report
    }
}
