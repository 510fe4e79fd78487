use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A GitLab user as embedded in merge request payloads.
///
/// # Examples
///
/// ```
/// use mrx_core::Author;
///
/// let author: Author =
///     serde_json::from_str(r#"{"id": 1, "name": "Test User", "username": "testuser"}"#).unwrap();
/// assert_eq!(author.username, "testuser");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    /// Numeric user id.
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: u64,
    /// Display name.
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// Login handle.
    #[serde(default, deserialize_with = "null_as_default")]
    pub username: String,
}

impl fmt::Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.username)
    }
}

/// The authenticated user behind the configured token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Numeric user id, usable as an `author_id` filter.
    pub id: u64,
    /// Login handle.
    pub username: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
}

/// A merged merge request as returned by the host's list endpoint.
///
/// Only `id` and `iid` are required. Every other field tolerates absence and
/// `null`, and a timestamp that cannot be read becomes `None`, so sparse or
/// irregular payloads still deserialize.
///
/// # Examples
///
/// ```
/// use mrx_core::MergeRequest;
///
/// let mr: MergeRequest = serde_json::from_str(
///     r#"{"id": 10, "iid": 1, "title": null, "merged_at": "2024-02-16"}"#,
/// )
/// .unwrap();
/// assert_eq!(mr.title, "");
/// assert!(mr.merged_at.is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeRequest {
    /// Instance-wide identifier.
    pub id: u64,
    /// Project-scoped sequential identifier.
    pub iid: u64,
    /// Owning project, when the host reports it.
    #[serde(default)]
    pub project_id: Option<u64>,
    /// Title line.
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    /// Body text, if any.
    #[serde(default)]
    pub description: Option<String>,
    /// Host state, `merged` for everything the fetcher returns.
    #[serde(default, deserialize_with = "null_as_default")]
    pub state: String,
    /// Creation time.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    /// Last update time.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Merge time.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub merged_at: Option<DateTime<Utc>>,
    /// User who opened the merge request.
    #[serde(default, deserialize_with = "null_as_default")]
    pub author: Author,
    /// User who merged it.
    #[serde(default)]
    pub merged_by: Option<Author>,
    /// Browser link.
    #[serde(default)]
    pub web_url: Option<String>,
    /// Branch the changes came from.
    #[serde(default)]
    pub source_branch: Option<String>,
    /// Branch the changes were merged into.
    #[serde(default)]
    pub target_branch: Option<String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// RFC 3339 first, then a bare date at midnight UTC; anything else is dropped.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<serde_json::Value>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let Some(text) = raw.as_str() else {
        return Ok(None);
    };
    if let Ok(at) = DateTime::parse_from_rfc3339(text) {
        return Ok(Some(at.with_timezone(&Utc)));
    }
    Ok(NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|at| at.and_utc()))
}

/// Whether a diff line was added or removed.
///
/// # Examples
///
/// ```
/// use mrx_core::LineChangeType;
///
/// assert_eq!(LineChangeType::Add.to_string(), "add");
/// assert_eq!(serde_json::to_string(&LineChangeType::Delete).unwrap(), "\"delete\"");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineChangeType {
    /// Line present only in the new version.
    Add,
    /// Line present only in the old version.
    Delete,
}

impl fmt::Display for LineChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineChangeType::Add => write!(f, "add"),
            LineChangeType::Delete => write!(f, "delete"),
        }
    }
}

/// One added or deleted line, with its marker and separating space stripped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineChange {
    #[serde(rename = "type")]
    pub kind: LineChangeType,
    pub content: String,
}

impl LineChange {
    /// Create an added line.
    pub fn add(content: impl Into<String>) -> Self {
        Self {
            kind: LineChangeType::Add,
            content: content.into(),
        }
    }

    /// Create a deleted line.
    pub fn delete(content: impl Into<String>) -> Self {
        Self {
            kind: LineChangeType::Delete,
            content: content.into(),
        }
    }
}

/// The changes to a single file within one merge request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileChange {
    /// Path before the change.
    pub old_path: String,
    /// Path after the change.
    pub new_path: String,
    /// Raw diff text as delivered by the host.
    pub diff: String,
    /// Classified add/delete lines, in diff order.
    pub changes: Vec<LineChange>,
    #[serde(default)]
    pub new_file: bool,
    #[serde(default)]
    pub renamed_file: bool,
    #[serde(default)]
    pub deleted_file: bool,
}

impl FileChange {
    /// Number of added lines.
    pub fn additions(&self) -> usize {
        self.count(LineChangeType::Add)
    }

    /// Number of deleted lines.
    pub fn deletions(&self) -> usize {
        self.count(LineChangeType::Delete)
    }

    fn count(&self, kind: LineChangeType) -> usize {
        self.changes.iter().filter(|c| c.kind == kind).count()
    }
}

/// A merge request together with its resolved file changes.
///
/// Serializes as the merge request's own fields plus a `changes` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedResult {
    #[serde(flatten)]
    pub merge_request: MergeRequest,
    pub changes: Vec<FileChange>,
}

impl ExtractedResult {
    /// Total added lines across all files.
    pub fn additions(&self) -> usize {
        self.changes.iter().map(FileChange::additions).sum()
    }

    /// Total deleted lines across all files.
    pub fn deletions(&self) -> usize {
        self.changes.iter().map(FileChange::deletions).sum()
    }
}

/// Envelope returned by the transport: the decoded body and the HTTP status.
///
/// `data` is optional because a success response without a body is possible;
/// consumers decide whether that is an error.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse<T> {
    pub data: Option<T>,
    pub status: u16,
}

impl<T> ApiResponse<T> {
    /// Wrap a decoded body.
    pub fn new(data: T, status: u16) -> Self {
        Self {
            data: Some(data),
            status,
        }
    }
}

/// Report file formats.
///
/// # Examples
///
/// ```
/// use mrx_core::OutputFormat;
///
/// let fmt: OutputFormat = "md".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Markdown);
/// assert_eq!(fmt.extension(), "md");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Pretty-printed JSON array of results.
    Json,
    /// One row per merge request.
    Csv,
    /// Human-readable Markdown document.
    Markdown,
}

impl OutputFormat {
    /// All formats, in the order reports are written.
    pub const ALL: [OutputFormat; 3] = [OutputFormat::Json, OutputFormat::Csv, OutputFormat::Markdown];

    /// File extension used for this format.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Markdown => "md",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Csv => write!(f, "csv"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_request() -> MergeRequest {
        serde_json::from_value(serde_json::json!({
            "id": 101,
            "iid": 7,
            "title": "Add login page",
            "state": "merged",
            "merged_at": "2024-02-16T00:00:00Z",
            "author": { "id": 1, "name": "Test User", "username": "testuser" }
        }))
        .unwrap()
    }

    #[test]
    fn merge_request_tolerates_sparse_payload() {
        let mr = sample_request();
        assert_eq!(mr.iid, 7);
        assert_eq!(mr.description, None);
        assert!(mr.merged_by.is_none());
        assert_eq!(
            mr.merged_at.unwrap().to_rfc3339(),
            "2024-02-16T00:00:00+00:00"
        );
    }

    #[test]
    fn line_change_serializes_type_key() {
        let json = serde_json::to_value(LineChange::add("x")).unwrap();
        assert_eq!(json["type"], "add");
        assert_eq!(json["content"], "x");
    }

    #[test]
    fn extracted_result_flattens_merge_request() {
        let result = ExtractedResult {
            merge_request: sample_request(),
            changes: vec![FileChange {
                old_path: "a.rs".into(),
                new_path: "a.rs".into(),
                diff: "+ x\n- y".into(),
                changes: vec![LineChange::add("x"), LineChange::delete("y")],
                new_file: false,
                renamed_file: false,
                deleted_file: false,
            }],
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["iid"], 7);
        assert_eq!(json["title"], "Add login page");
        assert_eq!(json["changes"][0]["changes"][1]["type"], "delete");
        assert_eq!(result.additions(), 1);
        assert_eq!(result.deletions(), 1);
    }

    #[test]
    fn output_format_from_str() {
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("CSV".parse::<OutputFormat>().unwrap(), OutputFormat::Csv);
        assert_eq!("markdown".parse::<OutputFormat>().unwrap(), OutputFormat::Markdown);
        assert!("sarif".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn null_fields_fall_back_to_defaults() {
        let mr: MergeRequest = serde_json::from_value(serde_json::json!({
            "id": 3,
            "iid": 1,
            "title": null,
            "state": null,
            "author": null,
            "merged_by": null,
            "description": null
        }))
        .unwrap();
        assert_eq!(mr.title, "");
        assert_eq!(mr.state, "");
        assert_eq!(mr.author, Author::default());
        assert!(mr.merged_by.is_none());
    }

    #[test]
    fn author_with_null_name_deserializes() {
        let author: Author =
            serde_json::from_value(serde_json::json!({ "id": 1, "name": null, "username": "u" }))
                .unwrap();
        assert_eq!(author.name, "");
        assert_eq!(author.username, "u");
    }

    #[test]
    fn timestamps_are_read_leniently() {
        let mr: MergeRequest = serde_json::from_value(serde_json::json!({
            "id": 3,
            "iid": 1,
            "created_at": "2024-02-15T08:00:00.123+01:00",
            "updated_at": "not a date",
            "merged_at": "2024-02-16"
        }))
        .unwrap();
        assert_eq!(
            mr.created_at.unwrap().to_rfc3339(),
            "2024-02-15T07:00:00.123+00:00"
        );
        assert!(mr.updated_at.is_none());
        assert_eq!(mr.merged_at.unwrap().to_rfc3339(), "2024-02-16T00:00:00+00:00");
    }

    #[test]
    fn non_string_timestamp_is_none() {
        let mr: MergeRequest =
            serde_json::from_value(serde_json::json!({ "id": 3, "iid": 1, "merged_at": 1700000000 }))
                .unwrap();
        assert!(mr.merged_at.is_none());
    }
}
