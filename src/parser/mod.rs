//! Measurement file parsing
//!
//! Raw bytes go through the [`archive`] extractor when compressed, then the
//! [`document`] parser builds an [`ImportedFile`](crate::types::ImportedFile)
//! with the help of the [`points`] decoder.
//!
//! # Components
//!
//! - [`xml_tree`] - XML to loose value tree, with the array-coercion rules
//! - [`points`] - Raw `<points>` text to X/Y series
//! - [`document`] - Value tree to typed model
//! - [`archive`] - Zip extraction
//! - [`ids`] - Identifier generation per import session

pub mod archive;
pub mod document;
pub mod ids;
pub mod points;
pub mod xml_tree;

pub use archive::{extract_from_archive, is_archive};
pub use document::parse_document;
pub use ids::{IdSource, SequentialIds, UuidIds};
pub use points::{decode_points, PointSeries};
pub use xml_tree::{parse_xml_tree, ArrayPath, XmlNode};

use crate::error::{CurveError, Result};
use crate::types::ImportedFile;

/// Parse a file from its raw bytes.
///
/// Zip archives (detected by magic bytes) are extracted first; anything else
/// is decoded as UTF-8 text, replacing invalid sequences.
pub fn parse_bytes(bytes: &[u8], filename: &str, ids: &mut dyn IdSource) -> Result<ImportedFile> {
    if is_archive(bytes) {
        let text = extract_from_archive(bytes)?;
        return parse_document(&text, filename, ids);
    }
    if bytes.is_empty() {
        return Err(CurveError::Xml("empty file".to_string()));
    }
    let text = String::from_utf8_lossy(bytes);
    parse_document(&text, filename, ids)
}
