//! Path-based filtering of extracted file changes.
//!
//! Drops files matching user-supplied glob patterns or extensions (lock
//! files, snapshots, generated code) from the results before they are
//! written to reports.

use std::fmt;
use std::path::Path;

use mrx_core::{ExtractConfig, ExtractedResult, FileChange, MrxError};

/// Glob patterns and extensions of files to leave out of the reports.
///
/// # Examples
///
/// ```
/// use mrx_difflens::filter::ChangeFilter;
///
/// let filter = ChangeFilter::new(&["*.lock".to_string()], &["snap".to_string()]).unwrap();
/// assert!(filter.should_skip("Cargo.lock").is_some());
/// assert!(filter.should_skip("ui/button.snap").is_some());
/// assert!(filter.should_skip("src/main.rs").is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ChangeFilter {
    skip_patterns: Vec<glob::Pattern>,
    skip_extensions: Vec<String>,
}

impl ChangeFilter {
    /// Build a filter from raw glob patterns and extensions.
    ///
    /// # Errors
    ///
    /// Returns [`MrxError::Config`] if a pattern is not a valid glob.
    pub fn new(patterns: &[String], extensions: &[String]) -> Result<Self, MrxError> {
        let skip_patterns = patterns
            .iter()
            .map(|pat| {
                glob::Pattern::new(pat)
                    .map_err(|e| MrxError::Config(format!("invalid skip pattern '{pat}': {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let skip_extensions = extensions
            .iter()
            .map(|ext| ext.trim_start_matches('.').to_string())
            .collect();

        Ok(Self {
            skip_patterns,
            skip_extensions,
        })
    }

    /// Build a filter from the `[extract]` section of the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`MrxError::Config`] if a pattern is not a valid glob.
    pub fn from_config(config: &ExtractConfig) -> Result<Self, MrxError> {
        Self::new(&config.skip_patterns, &config.skip_extensions)
    }

    /// `true` when the filter would never skip anything.
    pub fn is_empty(&self) -> bool {
        self.skip_patterns.is_empty() && self.skip_extensions.is_empty()
    }

    /// Return why `path` should be skipped, or `None` to keep it.
    pub fn should_skip(&self, path: &str) -> Option<SkipReason> {
        if let Some(ext) = Path::new(path).extension().and_then(|e| e.to_str()) {
            if self.skip_extensions.iter().any(|skip| skip == ext) {
                return Some(SkipReason::Extension(ext.to_string()));
            }
        }

        self.skip_patterns
            .iter()
            .find(|pat| pat.matches(path))
            .map(|pat| SkipReason::PatternMatch(pat.to_string()))
    }

    /// Remove skipped files from every result.
    ///
    /// Merge requests themselves are always kept, even when all of their
    /// files are filtered out.
    pub fn apply(&self, results: Vec<ExtractedResult>) -> FilterResult {
        let mut kept = Vec::with_capacity(results.len());
        let mut skipped = Vec::new();

        for mut result in results {
            let iid = result.merge_request.iid;
            let (keep, removed): (Vec<FileChange>, Vec<FileChange>) =
                std::mem::take(&mut result.changes)
                    .into_iter()
                    .partition(|change| self.reason_for(change).is_none());

            for change in removed {
                if let Some(reason) = self.reason_for(&change) {
                    let path = if change.deleted_file {
                        change.old_path
                    } else {
                        change.new_path
                    };
                    skipped.push(SkippedFile { iid, path, reason });
                }
            }

            result.changes = keep;
            kept.push(result);
        }

        FilterResult { kept, skipped }
    }

    // Deleted files only have a meaningful old path.
    fn reason_for(&self, change: &FileChange) -> Option<SkipReason> {
        let path = if change.deleted_file {
            &change.old_path
        } else {
            &change.new_path
        };
        self.should_skip(path)
    }
}

/// Results after filtering, plus what was removed.
#[derive(Debug, Clone)]
pub struct FilterResult {
    /// Results with skipped files removed.
    pub kept: Vec<ExtractedResult>,
    /// Files that were removed, with reasons.
    pub skipped: Vec<SkippedFile>,
}

/// A file removed from a merge request's changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    /// Merge request the file belonged to.
    pub iid: u64,
    /// Path that matched: the new path, or the old one for deleted files.
    pub path: String,
    /// Why the file was skipped.
    pub reason: SkipReason,
}

/// Reason a file was skipped.
///
/// # Examples
///
/// ```
/// use mrx_difflens::filter::SkipReason;
///
/// let reason = SkipReason::PatternMatch("*.lock".into());
/// assert_eq!(reason.to_string(), "pattern: *.lock");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Matched a skip glob pattern.
    PatternMatch(String),
    /// Has a skipped extension.
    Extension(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::PatternMatch(pat) => write!(f, "pattern: {pat}"),
            SkipReason::Extension(ext) => write!(f, "extension: .{ext}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use mrx_core::{Author, MergeRequest};

    use super::*;

    fn change(path: &str) -> FileChange {
        FileChange {
            old_path: path.into(),
            new_path: path.into(),
            diff: "+ x".into(),
            changes: Vec::new(),
            new_file: false,
            renamed_file: false,
            deleted_file: false,
        }
    }

    fn result(iid: u64, paths: &[&str]) -> ExtractedResult {
        ExtractedResult {
            merge_request: MergeRequest {
                id: iid + 1000,
                iid,
                project_id: None,
                title: format!("MR {iid}"),
                description: None,
                state: "merged".into(),
                created_at: None,
                updated_at: None,
                merged_at: None,
                author: Author::default(),
                merged_by: None,
                web_url: None,
                source_branch: None,
                target_branch: None,
            },
            changes: paths.iter().map(|p| change(p)).collect(),
        }
    }

    #[test]
    fn empty_filter_keeps_everything() {
        let filter = ChangeFilter::default();
        assert!(filter.is_empty());
        let out = filter.apply(vec![result(1, &["a.rs", "Cargo.lock"])]);
        assert_eq!(out.kept[0].changes.len(), 2);
        assert!(out.skipped.is_empty());
    }

    #[test]
    fn patterns_remove_matching_files() {
        let filter = ChangeFilter::new(&["*.lock".into(), "fixtures/**".into()], &[]).unwrap();
        let out = filter.apply(vec![result(
            3,
            &["src/lib.rs", "Cargo.lock", "fixtures/data/a.json"],
        )]);
        assert_eq!(out.kept.len(), 1);
        assert_eq!(out.kept[0].changes.len(), 1);
        assert_eq!(out.kept[0].changes[0].new_path, "src/lib.rs");
        assert_eq!(out.skipped.len(), 2);
        assert!(out.skipped.iter().all(|s| s.iid == 3));
    }

    #[test]
    fn extensions_accept_leading_dot() {
        let filter = ChangeFilter::new(&[], &[".snap".into()]).unwrap();
        assert_eq!(
            filter.should_skip("ui/__snapshots__/button.snap"),
            Some(SkipReason::Extension("snap".into()))
        );
    }

    #[test]
    fn merge_request_kept_when_all_files_skipped() {
        let filter = ChangeFilter::new(&["*".into()], &[]).unwrap();
        let out = filter.apply(vec![result(9, &["only.txt"])]);
        assert_eq!(out.kept.len(), 1);
        assert!(out.kept[0].changes.is_empty());
    }

    #[test]
    fn deleted_files_match_on_old_path() {
        let filter = ChangeFilter::new(&["legacy/**".into()], &[]).unwrap();
        let mut gone = change("legacy/old.rs");
        gone.new_path = "/dev/null".into();
        gone.deleted_file = true;
        let mut mr = result(4, &[]);
        mr.changes.push(gone);
        let out = filter.apply(vec![mr]);
        assert!(out.kept[0].changes.is_empty());
    }

    #[test]
    fn invalid_glob_is_config_error() {
        let err = ChangeFilter::new(&["[unclosed".into()], &[]).unwrap_err();
        assert!(matches!(err, MrxError::Config(_)));
    }

    #[test]
    fn from_config_uses_extract_settings() {
        let config = ExtractConfig {
            skip_patterns: vec!["*.min.js".into()],
            ..ExtractConfig::default()
        };
        let filter = ChangeFilter::from_config(&config).unwrap();
        assert!(filter.should_skip("dist/app.min.js").is_some());
    }
}
