//! Error handling for curvescope
//!
//! This module defines the error taxonomy and a Result alias for use
//! throughout the crate. Per-file failures (malformed XML, archive problems)
//! surface as [`CurveError`] so the import layer can skip the file and keep
//! going with the rest of the batch.

use thiserror::Error;

/// Main error type for curvescope operations
#[derive(Error, Debug)]
pub enum CurveError {
    /// The document is not well-formed XML
    #[error("XML error: {0}")]
    Xml(String),

    /// Archive container could not be read
    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    /// File type is not one of the supported formats
    #[error("Unsupported file: {0}")]
    UnsupportedFile(String),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<CurveError>,
    },
}

impl CurveError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        CurveError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Whether this error (or the error it wraps) is a missing XML entry in an archive
    pub fn is_missing_xml_entry(&self) -> bool {
        match self {
            CurveError::Archive(ArchiveError::NoXmlEntry) => true,
            CurveError::WithContext { source, .. } => source.is_missing_xml_entry(),
            _ => false,
        }
    }
}

impl From<quick_xml::Error> for CurveError {
    fn from(err: quick_xml::Error) -> Self {
        CurveError::Xml(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for CurveError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        CurveError::Xml(err.to_string())
    }
}

/// Failures while pulling the embedded document out of a zip container.
///
/// A container without any `.xml` entry is kept apart from a container that
/// fails to decompress, so diagnostics can tell the two apart.
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// The archive has no entry ending in `.xml`
    #[error("no XML entry found in archive")]
    NoXmlEntry,

    /// The zip structure or a compressed stream is broken
    #[error("decompression failed: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Reading the entry failed mid-stream
    #[error("failed to read archive entry: {0}")]
    Io(#[from] std::io::Error),

    /// The entry is not valid UTF-8
    #[error("archive entry is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Result type alias for curvescope operations
pub type Result<T> = std::result::Result<T, CurveError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<CurveError>,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.into().with_context(f()))
    }
}
