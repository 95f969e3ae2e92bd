//! Best-effort structured-answer extraction from agent response text.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

// Brace-delimited block containing at least one quoted key, e.g.
// {"verdict": "ERROR"}. Tried before the broad pattern so keyed objects
// win over incidental brace pairs earlier in the text.
static KEYED_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\{[^{}]*"[^"]+"\s*:\s*[^{}]*\}"#).unwrap());

static ANY_OBJECT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{[^{}]*\}").unwrap());

/// Scan `text` for a brace-delimited key/value block and return the first
/// candidate that parses as a JSON object, pretty-printed with stable key
/// ordering.
///
/// Total over its input: parse failures degrade to `None`, never to an
/// error, so extraction can never turn a successful response into a
/// failed record.
pub fn extract_structured_answer(text: &str) -> Option<String> {
    for pattern in [&*KEYED_OBJECT, &*ANY_OBJECT] {
        for candidate in pattern.find_iter(text) {
            if let Ok(value) = serde_json::from_str::<Value>(candidate.as_str())
                && value.is_object()
            {
                return serde_json::to_string_pretty(&value).ok();
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_well_formed_block_is_extracted() {
        let answer = extract_structured_answer(
            r#"The line looks broken. {"verdict": "ERROR", "reason": "disk"} Hope that helps."#,
        )
        .unwrap();
        let value: Value = serde_json::from_str(&answer).unwrap();
        assert_eq!(value["verdict"], "ERROR");
        assert_eq!(value["reason"], "disk");
    }

    #[test]
    fn text_without_a_block_yields_none() {
        assert_eq!(extract_structured_answer("all clear, nothing to report"), None);
        assert_eq!(extract_structured_answer(""), None);
    }

    #[test]
    fn unparseable_candidates_are_skipped() {
        let answer =
            extract_structured_answer(r#"{not json at all} and then {"verdict": "INFO"}"#).unwrap();
        let value: Value = serde_json::from_str(&answer).unwrap();
        assert_eq!(value["verdict"], "INFO");
    }

    #[test]
    fn extraction_is_idempotent() {
        let first =
            extract_structured_answer(r#"prefix {"b": 2, "a": 1} suffix"#).unwrap();
        let second = extract_structured_answer(&first).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn non_object_json_is_ignored() {
        // Brace scan never matches bare arrays or scalars.
        assert_eq!(extract_structured_answer("[1, 2, 3] or just 42"), None);
    }
}
