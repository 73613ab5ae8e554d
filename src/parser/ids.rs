//! Identifier generation for imported files and channels.
//!
//! The parser never reaches for a global generator; callers hand it an
//! [`IdSource`], normally one per import session.

use uuid::Uuid;

/// Source of unique identifiers
#[cfg_attr(test, mockall::automock)]
pub trait IdSource: Send {
    /// Produce the next identifier. Values must not repeat within a session.
    fn next_id(&mut self) -> String;
}

/// Random v4 UUIDs
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIds;

impl IdSource for UuidIds {
    fn next_id(&mut self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Deterministic `prefix-N` identifiers, counting from 1
#[derive(Debug, Clone)]
pub struct SequentialIds {
    prefix: String,
    next: u64,
}

impl SequentialIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 1,
        }
    }
}

impl IdSource for SequentialIds {
    fn next_id(&mut self) -> String {
        let id = format!("{}-{}", self.prefix, self.next);
        self.next += 1;
        id
    }
}
