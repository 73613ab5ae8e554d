//! Cooperative cancellation shared between the caller and long-running loops.
//!
//! Loops check the token between iterations (per file, per row, per
//! sub-batch). Work that already finished stays valid after cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cloneable cancellation flag
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; every clone observes it
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Progress of a batch computation, reported before each item
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    /// 1-based index of the item about to be processed
    pub current: usize,
    pub total: usize,
    /// Human readable label, usually a filename
    pub label: String,
}
