use serde_json::Value;

/// Remove a leading ```` ```json ```` / ```` ``` ```` marker and a trailing
/// ```` ``` ```` marker. Unfenced text comes back trimmed.
pub fn strip_fences(text: &str) -> &str {
    let mut t = text.trim();
    if let Some(rest) = t.strip_prefix("```") {
        let rest = rest
            .strip_prefix("json")
            .or_else(|| rest.strip_prefix("JSON"))
            .unwrap_or(rest);
        t = rest.trim_start();
    }
    if let Some(rest) = t.strip_suffix("```") {
        t = rest.trim_end();
    }
    t
}

/// Strip fences and parse what the model returned.
pub fn parse_model_json(text: &str) -> serde_json::Result<Value> {
    serde_json::from_str(strip_fences(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_fences_plain() {
        assert_eq!(strip_fences(r#"{"overall":58}"#), r#"{"overall":58}"#);
    }

    #[test]
    fn strip_fences_json_marker() {
        let text = "```json\n{\"overall\":58}\n```";
        assert_eq!(strip_fences(text), r#"{"overall":58}"#);
        assert_eq!(parse_model_json(text).unwrap()["overall"], 58);
    }

    #[test]
    fn strip_fences_bare_marker_and_whitespace() {
        let text = "  ```\n[1, 2]\n```  \n";
        assert_eq!(strip_fences(text), "[1, 2]");
    }

    #[test]
    fn strip_fences_same_line() {
        assert_eq!(strip_fences("```json {\"a\":1}```"), "{\"a\":1}");
    }

    #[test]
    fn parse_failure_is_an_error() {
        assert!(parse_model_json("```json\nnot json\n```").is_err());
        assert!(parse_model_json("").is_err());
    }
}
