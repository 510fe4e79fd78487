use mrx_core::{LineChange, LineChangeType, MrxError};

const ADD_MARKER: &str = "+ ";
const DELETE_MARKER: &str = "- ";

/// Classify every line of a diff as an addition, a deletion, or neither.
///
/// Lines starting with `"+ "` become [`LineChangeType::Add`], lines starting
/// with `"- "` become [`LineChangeType::Delete`]; the marker and exactly one
/// space are stripped from the content. Every other line (context lines,
/// file headers, a bare `+`, `+nospace`) is dropped without error.
///
/// Runs in a single pass over the input and preserves line order.
///
/// # Examples
///
/// ```
/// use mrx_core::LineChangeType;
/// use mrx_difflens::classifier::classify;
///
/// let changes = classify("+ added\n unchanged\n- removed");
/// assert_eq!(changes.len(), 2);
/// assert_eq!(changes[0].kind, LineChangeType::Add);
/// assert_eq!(changes[0].content, "added");
/// assert_eq!(changes[1].kind, LineChangeType::Delete);
///
/// assert!(classify("").is_empty());
/// ```
pub fn classify(diff: &str) -> Vec<LineChange> {
    diff.split('\n').filter_map(classify_line).collect()
}

/// Classify a diff taken straight from a JSON payload.
///
/// # Errors
///
/// Returns [`MrxError::Parse`] if `value` is not a JSON string (including
/// `null`).
///
/// # Examples
///
/// ```
/// use mrx_difflens::classifier::classify_value;
///
/// let changes = classify_value(&serde_json::json!("+ x")).unwrap();
/// assert_eq!(changes.len(), 1);
/// assert!(classify_value(&serde_json::Value::Null).is_err());
/// ```
pub fn classify_value(value: &serde_json::Value) -> Result<Vec<LineChange>, MrxError> {
    match value.as_str() {
        Some(text) => Ok(classify(text)),
        None => Err(MrxError::Parse(format!(
            "expected diff text, got {}",
            json_kind(value)
        ))),
    }
}

fn classify_line(line: &str) -> Option<LineChange> {
    if let Some(content) = line.strip_prefix(ADD_MARKER) {
        return Some(LineChange {
            kind: LineChangeType::Add,
            content: content.to_string(),
        });
    }
    line.strip_prefix(DELETE_MARKER).map(|content| LineChange {
        kind: LineChangeType::Delete,
        content: content.to_string(),
    })
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
