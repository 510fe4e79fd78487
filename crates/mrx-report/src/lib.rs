//! Report writers for extracted merge requests.
//!
//! Serializes an [`ExtractedResult`] set to JSON, CSV, and Markdown files,
//! and dumps each file's raw diff for inspection.

pub mod csv;
pub mod markdown;

use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use mrx_core::{ExtractedResult, MrxError, OutputFormat};

/// Render `results` in a single format.
///
/// # Errors
///
/// Returns [`MrxError::Serialization`] if JSON encoding fails.
///
/// # Examples
///
/// ```
/// use mrx_core::OutputFormat;
/// use mrx_report::render;
///
/// assert_eq!(render(&[], OutputFormat::Json).unwrap(), "[]");
/// ```
pub fn render(results: &[ExtractedResult], format: OutputFormat) -> Result<String, MrxError> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(results)?),
        OutputFormat::Csv => Ok(csv::format_csv(results)),
        OutputFormat::Markdown => Ok(markdown::format_markdown(results)),
    }
}

/// Filesystem-safe timestamp used in report file names.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use mrx_report::report_timestamp;
///
/// let at = Utc.with_ymd_and_hms(2024, 2, 16, 9, 30, 0).unwrap();
/// assert_eq!(report_timestamp(at), "2024-02-16T09-30-00-000Z");
/// ```
pub fn report_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-")
}

/// Write one `merge-requests-<timestamp>.<ext>` report per format into `dir`,
/// creating the directory if needed. Returns the written paths in format order.
///
/// # Errors
///
/// Returns [`MrxError::Io`] if the directory or a file cannot be written.
pub fn write_reports(
    results: &[ExtractedResult],
    dir: &Path,
    formats: &[OutputFormat],
    timestamp: &str,
) -> Result<Vec<PathBuf>, MrxError> {
    std::fs::create_dir_all(dir)?;

    let mut written = Vec::with_capacity(formats.len());
    for &format in formats {
        let path = dir.join(format!("merge-requests-{timestamp}.{}", format.extension()));
        std::fs::write(&path, render(results, format)?)?;
        tracing::debug!(path = %path.display(), %format, "wrote report");
        written.push(path);
    }
    Ok(written)
}

/// Dump every file's raw diff to `<dir>/mr-<iid>/<new_path>.diff`, with `/`
/// in the path replaced by `_`. Returns the written paths.
///
/// # Errors
///
/// Returns [`MrxError::Io`] if a directory or file cannot be written.
pub fn write_diff_files(results: &[ExtractedResult], dir: &Path) -> Result<Vec<PathBuf>, MrxError> {
    let mut written = Vec::new();
    for result in results {
        if result.changes.is_empty() {
            continue;
        }
        let mr_dir = dir.join(format!("mr-{}", result.merge_request.iid));
        std::fs::create_dir_all(&mr_dir)?;

        for change in &result.changes {
            let path = mr_dir.join(diff_file_name(&change.new_path));
            std::fs::write(&path, &change.diff)?;
            written.push(path);
        }
    }
    Ok(written)
}

/// File name used for a diff dump of `new_path`.
///
/// # Examples
///
/// ```
/// use mrx_report::diff_file_name;
///
/// assert_eq!(diff_file_name("src/app/main.ts"), "src_app_main.ts.diff");
/// ```
pub fn diff_file_name(new_path: &str) -> String {
    format!("{}.diff", new_path.replace(['/', '\\'], "_"))
}
