//! Zip container support
//!
//! Compressed measurement files are zip archives holding one XML document.
//! Files are small, so the whole archive is decompressed in memory.

use crate::error::ArchiveError;
use std::io::{Cursor, Read};

/// Local file header signature at the start of every zip archive
const ZIP_MAGIC: &[u8; 4] = b"PK\x03\x04";

/// Whether the bytes look like a zip archive
pub fn is_archive(bytes: &[u8]) -> bool {
    bytes.starts_with(ZIP_MAGIC)
}

/// Extract the text of the first `*.xml` entry (case-insensitive) from a zip archive
pub fn extract_from_archive(bytes: &[u8]) -> Result<String, ArchiveError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        if entry.is_dir() || !entry.name().to_ascii_lowercase().ends_with(".xml") {
            continue;
        }

        tracing::debug!("Extracting archive entry {}", entry.name());
        let mut buf = Vec::with_capacity(usize::try_from(entry.size()).unwrap_or(0));
        entry.read_to_end(&mut buf)?;
        let text = String::from_utf8(buf)?;
        return Ok(match text.strip_prefix('\u{feff}') {
            Some(stripped) => stripped.to_string(),
            None => text,
        });
    }

    Err(ArchiveError::NoXmlEntry)
}
