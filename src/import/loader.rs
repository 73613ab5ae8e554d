//! Directory scanning and single-file loading

use super::{ImportReport, SkipEntry};
use crate::cancel::CancelToken;
use crate::error::{CurveError, Result, ResultExt};
use crate::parser::{self, IdSource};
use crate::types::ImportedFile;
use std::path::{Path, PathBuf};

/// Extension treated as a zip archive regardless of content
pub const ARCHIVE_EXTENSION: &str = "zip";

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| extensions.iter().any(|want| want.eq_ignore_ascii_case(ext)))
}

fn scan_into(dir: &Path, extensions: &[String], found: &mut Vec<PathBuf>) -> Result<()> {
    let entries = std::fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.is_dir() {
            scan_into(&path, extensions, found)?;
        } else if has_extension(&path, extensions) {
            found.push(path);
        }
    }
    Ok(())
}

/// Recursively list files under `dir` whose extension matches one of
/// `extensions` (case-insensitive), sorted by path
pub fn scan_directory(dir: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    scan_into(dir, extensions, &mut found)?;
    found.sort();
    tracing::debug!("Found {} files under {}", found.len(), dir.display());
    Ok(found)
}

/// Expand a mix of files and directories into a flat file list.
///
/// Files are kept as given; directories are scanned.
pub fn expand_paths(paths: &[PathBuf], extensions: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            files.extend(scan_directory(path, extensions)?);
        } else {
            files.push(path.clone());
        }
    }
    Ok(files)
}

/// Read and parse one file.
///
/// `.zip` files and anything starting with the zip signature are extracted
/// first. The file name, not the full path, becomes the file's label.
pub fn load_file(path: &Path, ids: &mut dyn IdSource) -> Result<ImportedFile> {
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| CurveError::UnsupportedFile(path.display().to_string()))?;

    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;

    let by_extension = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ARCHIVE_EXTENSION));

    // A .zip without the signature still goes through the extractor so it
    // fails as an archive error
    let file = if by_extension && !parser::is_archive(&bytes) {
        let text = parser::extract_from_archive(&bytes).context(filename.clone())?;
        parser::parse_document(&text, &filename, ids)
    } else {
        parser::parse_bytes(&bytes, &filename, ids)
    }
    .context(filename.clone())?;

    tracing::debug!(
        "Parsed {}: {} channels, {} points",
        filename,
        file.channels.len(),
        file.total_points()
    );
    Ok(file)
}

/// Load `paths` one after another on the calling thread.
///
/// Failures become skip entries. Cancellation is checked before each file.
pub fn import_sequential(
    paths: &[PathBuf],
    ids: &mut dyn IdSource,
    cancel: &CancelToken,
) -> ImportReport {
    let mut report = ImportReport {
        submitted: paths.len(),
        ..Default::default()
    };

    for path in paths {
        if cancel.is_cancelled() {
            report.cancelled = true;
            break;
        }
        match load_file(path, ids) {
            Ok(file) => report.files.push(file),
            Err(e) => {
                tracing::warn!("Skipping {}: {}", path.display(), e);
                report.skipped.push(SkipEntry {
                    path: path.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    tracing::info!(
        "Imported {} of {} files ({} skipped)",
        report.files.len(),
        report.submitted,
        report.skipped.len()
    );
    report
}
