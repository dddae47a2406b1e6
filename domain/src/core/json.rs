//! Helpers for reading structured output out of model text.

/// Return the JSON payload of a model reply.
///
/// JSON-mode replies are usually bare objects, but models still wrap them
/// in a ```json fence now and then. The fence is stripped when present;
/// otherwise the span from the first `{` to the last `}` is returned.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    let body = match trimmed.strip_prefix("```") {
        Some(rest) => {
            let rest = rest.strip_prefix("json").unwrap_or(rest);
            rest.strip_suffix("```").unwrap_or(rest).trim()
        }
        None => trimmed,
    };

    let start = body.find('{')?;
    let end = body.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&body[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_object() {
        assert_eq!(extract_json_object(r#"{"a":1}"#), Some(r#"{"a":1}"#));
    }

    #[test]
    fn test_fenced_object() {
        let text = "```json\n{\"selectedIds\": [\"x\"]}\n```";
        assert_eq!(extract_json_object(text), Some("{\"selectedIds\": [\"x\"]}"));
    }

    #[test]
    fn test_prose_around_object() {
        let text = "Here you go: {\"a\": 2} hope that helps";
        assert_eq!(extract_json_object(text), Some("{\"a\": 2}"));
    }

    #[test]
    fn test_no_object() {
        assert_eq!(extract_json_object(""), None);
        assert_eq!(extract_json_object("no json here"), None);
        assert_eq!(extract_json_object("} backwards {"), None);
    }
}
