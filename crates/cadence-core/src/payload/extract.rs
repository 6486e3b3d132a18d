//! Lenient JSON extraction from model output.
//!
//! Models wrap JSON in markdown fences or surround it with prose. These
//! helpers strip the fences, cut the text down to the outermost delimited
//! span and parse what is left.

use serde_json::Value;
use thiserror::Error;

/// Errors from lenient extraction.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractError {
    #[error("payload is empty")]
    Empty,

    #[error("payload is not valid JSON: {0}")]
    InvalidJson(String),
}

/// Remove ```` ```json ```` and ```` ``` ```` markers and surrounding whitespace.
pub fn strip_code_fences(raw: &str) -> String {
    raw.replace("```json", "").replace("```", "").trim().to_string()
}

/// The span from the first `open` to the last `close`, inclusive.
///
/// Returns `None` when either delimiter is missing or they are out of order.
pub fn slice_delimited(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    if end < start {
        return None;
    }
    Some(&text[start..end + close.len_utf8()])
}

/// Extract a JSON value whose outermost structure is a list.
///
/// Falls back to parsing the whole cleaned text when no `[...]` span exists,
/// so a bare object still parses (and is then rejected by the caller).
pub fn extract_json_array(raw: &str) -> Result<Value, ExtractError> {
    extract_with(raw, '[', ']')
}

/// Extract a JSON value whose outermost structure is an object.
pub fn extract_json_object(raw: &str) -> Result<Value, ExtractError> {
    extract_with(raw, '{', '}')
}

fn extract_with(raw: &str, open: char, close: char) -> Result<Value, ExtractError> {
    let cleaned = strip_code_fences(raw);
    if cleaned.is_empty() {
        return Err(ExtractError::Empty);
    }

    let candidate = slice_delimited(&cleaned, open, close).unwrap_or(&cleaned);
    serde_json::from_str(candidate).map_err(|e| ExtractError::InvalidJson(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unfenced_array() {
        let value = extract_json_array(r#"[{"a": 1}]"#).unwrap();
        assert!(value.is_array());
    }

    #[test]
    fn test_fenced_array() {
        let raw = "```json\n[{\"a\": 1}]\n```";
        let value = extract_json_array(raw).unwrap();
        assert_eq!(value[0]["a"], 1);
    }

    #[test]
    fn test_array_wrapped_in_prose() {
        let raw = "Here are your tracks:\n[{\"a\": [1, 2]}]\nEnjoy!";
        let value = extract_json_array(raw).unwrap();
        assert_eq!(value[0]["a"][1], 2);
    }

    #[test]
    fn test_truncated_array_fails() {
        let raw = r#"[{"recommendation_meta": {"reasoning": "cut off"#;
        assert!(matches!(
            extract_json_array(raw),
            Err(ExtractError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_empty_payload() {
        assert_eq!(extract_json_array("   "), Err(ExtractError::Empty));
        assert_eq!(extract_json_array("``````"), Err(ExtractError::Empty));
    }

    #[test]
    fn test_object_without_brackets_still_parses() {
        let value = extract_json_array(r#"{"error": "No response generated within limit"}"#).unwrap();
        assert!(value.is_object());
    }

    #[test]
    fn test_object_extraction_in_prose() {
        let raw = "Sure! {\"steps\": [\"search lo-fi\"]} Let me know.";
        let value = extract_json_object(raw).unwrap();
        assert_eq!(value["steps"][0], "search lo-fi");
    }

    #[test]
    fn test_out_of_order_delimiters() {
        assert_eq!(slice_delimited("] then [", '[', ']'), None);
        assert_eq!(slice_delimited("x [1] y", '[', ']'), Some("[1]"));
    }
}
