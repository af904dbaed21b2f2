use crate::record::StructuredRecord;
use serde_json::Value;
use tracing::debug;

/// Turn the completion service's raw reply into a structured record.
///
/// Three stages, never fails: a strict JSON parse, then a salvage parse of
/// the outermost `{...}` span (models like to wrap their JSON in prose),
/// then a `{"llm_text": <reply>}` fallback so the pipeline always ends with
/// some structured output.
pub fn normalize_reply(raw: &str) -> StructuredRecord {
    if let Ok(value) = serde_json::from_str::<Value>(raw) {
        return StructuredRecord::from_value(value);
    }

    if let Some(span) = outermost_json_span(raw) {
        if let Ok(value) = serde_json::from_str::<Value>(span) {
            debug!("reply was not pure json, salvaged the embedded object");
            return StructuredRecord::from_value(value);
        }
    }

    debug!("reply could not be parsed as json, keeping raw text");
    StructuredRecord::fallback(raw)
}

/// The substring spanning the first `{` through the last `}`, greedy across
/// newlines. None when no such span exists.
pub fn outermost_json_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn valid_json_parses_directly() {
        let record = normalize_reply(r#"{"metadata":{"filename":"a.pdf"},"fields":{}}"#);
        assert_eq!(record.metadata().filename.as_deref(), Some("a.pdf"));
        assert!(record.llm_text().is_none());
    }

    #[test]
    fn json_wrapped_in_prose_is_salvaged() {
        let reply = "Sure, here you go: {\"metadata\":{\"filename\":\"a.pdf\"},\"fields\":{},\"tables\":[],\"insights\":[]}";
        let record = normalize_reply(reply);

        assert_eq!(record.metadata().filename.as_deref(), Some("a.pdf"));
        assert_eq!(
            record.as_value(),
            &json!({"metadata":{"filename":"a.pdf"},"fields":{},"tables":[],"insights":[]})
        );
    }

    #[test]
    fn salvage_spans_newlines() {
        let reply = "Result:\n{\n  \"insights\": [\"ok\"]\n}\nDone.";
        let record = normalize_reply(reply);
        assert_eq!(record.insights(), vec!["ok".to_string()]);
    }

    #[test]
    fn garbage_degrades_to_raw_text_fallback() {
        let record = normalize_reply("no structure at all");
        assert_eq!(record.llm_text(), Some("no structure at all"));
    }

    #[test]
    fn unbalanced_braces_still_fall_back() {
        let record = normalize_reply("} nothing opens before this {");
        assert_eq!(record.llm_text(), Some("} nothing opens before this {"));
    }

    #[test]
    fn normalization_round_trips_well_formed_records() {
        let record = normalize_reply(
            r#"{"metadata":{"filename":"a.pdf","page_count":3},"fields":{"x":{"value":"1","confidence":"high","source":"p1"}},"tables":[],"insights":["fine"]}"#,
        );

        let round_tripped = normalize_reply(&record.to_json_pretty());
        assert_eq!(round_tripped, record);
    }

    #[test]
    fn span_helper_finds_outermost_braces() {
        assert_eq!(outermost_json_span("a {b {c} d} e"), Some("{b {c} d}"));
        assert_eq!(outermost_json_span("no braces"), None);
        assert_eq!(outermost_json_span("} reversed {"), None);
    }
}
