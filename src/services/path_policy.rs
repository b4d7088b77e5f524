//! Input classification and default output naming.
//!
//! Both decisions are pure functions of the path string. Nothing here touches
//! the filesystem, so a selection can be classified before it is validated.

use super::error::CleanError;
use crate::models::FileKind;
use camino::{Utf8Path, Utf8PathBuf};

/// Suffix inserted before the final extension of the default output name
pub const OUTPUT_SUFFIX: &str = "_cleaned";

/// Extension (compared case-insensitively) that marks an input as an archive
pub const ARCHIVE_EXTENSION: &str = "zip";

/// Classify an input and derive its default output path in one step
///
/// # Errors
/// `InvalidArgument` if `input` is empty or only whitespace.
pub fn classify_and_derive_output(input: &str) -> Result<(FileKind, Utf8PathBuf), CleanError> {
    if input.trim().is_empty() {
        return Err(CleanError::InvalidArgument(
            "input path must not be empty".to_string(),
        ));
    }

    let path = Utf8Path::new(input);
    Ok((classify(path), derive_output_path(path)))
}

/// Decide whether a path names a text file or a zip archive
pub fn classify(path: &Utf8Path) -> FileKind {
    match path.extension() {
        Some(ext) if ext.eq_ignore_ascii_case(ARCHIVE_EXTENSION) => FileKind::Archive,
        _ => FileKind::Text,
    }
}

/// Insert [`OUTPUT_SUFFIX`] before the final extension, or append it when there is none
///
/// `report.txt` becomes `report_cleaned.txt`, `report` becomes `report_cleaned`.
/// Re-applying the rule stacks the suffix.
pub fn derive_output_path(path: &Utf8Path) -> Utf8PathBuf {
    let Some(stem) = path.file_stem() else {
        return Utf8PathBuf::from(format!("{path}{OUTPUT_SUFFIX}"));
    };

    let file_name = match path.extension() {
        Some(ext) => format!("{stem}{OUTPUT_SUFFIX}.{ext}"),
        None => format!("{stem}{OUTPUT_SUFFIX}"),
    };

    path.with_file_name(file_name)
}
