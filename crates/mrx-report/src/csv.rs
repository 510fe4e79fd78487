use std::fmt::Write;

use chrono::{DateTime, Utc};
use mrx_core::ExtractedResult;

const HEADER: [&str; 12] = [
    "id",
    "iid",
    "project_id",
    "title",
    "state",
    "author",
    "merged_by",
    "created_at",
    "merged_at",
    "files_changed",
    "additions",
    "deletions",
];

/// Render one CSV row per merge request, with a header row.
///
/// Fields containing commas, quotes, or line breaks are quoted per RFC 4180.
///
/// # Examples
///
/// ```
/// use mrx_report::csv::format_csv;
///
/// let csv = format_csv(&[]);
/// assert!(csv.starts_with("id,iid,"));
/// assert_eq!(csv.lines().count(), 1);
/// ```
pub fn format_csv(results: &[ExtractedResult]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", HEADER.join(","));

    for result in results {
        let mr = &result.merge_request;
        let row = [
            mr.id.to_string(),
            mr.iid.to_string(),
            mr.project_id.map(|p| p.to_string()).unwrap_or_default(),
            mr.title.clone(),
            mr.state.clone(),
            mr.author.username.clone(),
            mr.merged_by
                .as_ref()
                .map(|u| u.username.clone())
                .unwrap_or_default(),
            timestamp(mr.created_at),
            timestamp(mr.merged_at),
            result.changes.len().to_string(),
            result.additions().to_string(),
            result.deletions().to_string(),
        ];
        let escaped: Vec<String> = row.iter().map(|field| escape(field)).collect();
        let _ = writeln!(out, "{}", escaped.join(","));
    }

    out
}

fn timestamp(value: Option<DateTime<Utc>>) -> String {
    value.map(|t| t.to_rfc3339()).unwrap_or_default()
}

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
