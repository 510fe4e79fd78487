use std::fmt::Write;

use mrx_core::{ExtractedResult, FileChange};

/// Render results as a Markdown document, one section per merge request.
///
/// # Examples
///
/// ```
/// use mrx_report::markdown::format_markdown;
///
/// assert_eq!(format_markdown(&[]), "No merged merge requests found.\n");
/// ```
pub fn format_markdown(results: &[ExtractedResult]) -> String {
    if results.is_empty() {
        return "No merged merge requests found.\n".into();
    }

    let mut out = String::new();
    for (idx, result) in results.iter().enumerate() {
        if idx > 0 {
            out.push('\n');
        }
        write_merge_request(&mut out, result);
    }
    out
}

fn write_merge_request(out: &mut String, result: &ExtractedResult) {
    let mr = &result.merge_request;
    let _ = writeln!(out, "# Merge Request: {}\n", mr.title);
    let _ = writeln!(out, "- **ID:** {}", mr.id);
    let _ = writeln!(out, "- **IID:** {}", mr.iid);
    if let Some(project) = mr.project_id {
        let _ = writeln!(out, "- **Project ID:** {project}");
    }
    let _ = writeln!(out, "- **State:** {}", mr.state);
    let _ = writeln!(out, "- **Author:** {}", mr.author);
    if let Some(by) = &mr.merged_by {
        let _ = writeln!(out, "- **Merged By:** {by}");
    }
    if let Some(at) = mr.created_at {
        let _ = writeln!(out, "- **Created At:** {}", at.to_rfc3339());
    }
    if let Some(at) = mr.updated_at {
        let _ = writeln!(out, "- **Updated At:** {}", at.to_rfc3339());
    }
    if let Some(at) = mr.merged_at {
        let _ = writeln!(out, "- **Merged At:** {}", at.to_rfc3339());
    }
    if let Some(url) = &mr.web_url {
        let _ = writeln!(out, "- **URL:** {url}");
    }

    if let Some(description) = mr.description.as_deref().filter(|d| !d.trim().is_empty()) {
        let _ = writeln!(out, "\n{}", description.trim_end());
    }

    let _ = writeln!(
        out,
        "\n## Changes ({} files, +{} -{})\n",
        result.changes.len(),
        result.additions(),
        result.deletions()
    );
    if result.changes.is_empty() {
        let _ = writeln!(out, "No file changes.");
        return;
    }
    for change in &result.changes {
        write_file_change(out, change);
    }
}

fn write_file_change(out: &mut String, change: &FileChange) {
    if change.old_path == change.new_path {
        let _ = writeln!(out, "### `{}`\n", change.new_path);
    } else {
        let _ = writeln!(out, "### `{}` → `{}`\n", change.old_path, change.new_path);
    }
    let _ = writeln!(
        out,
        "+{} -{}\n",
        change.additions(),
        change.deletions()
    );

    let fence = fence_for(&change.diff);
    let _ = writeln!(out, "{fence}diff");
    out.push_str(&change.diff);
    if !change.diff.ends_with('\n') {
        out.push('\n');
    }
    let _ = writeln!(out, "{fence}\n");
}

// A fence must be longer than any backtick run inside the block.
fn fence_for(content: &str) -> String {
    let mut longest = 0;
    let mut run = 0;
    for ch in content.chars() {
        if ch == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    "`".repeat(longest.max(2) + 1)
}
