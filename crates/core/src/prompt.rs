use crate::models::{KeyValueMap, TableSet};

/// Appended whenever the extracted text is cut to the character budget, so
/// the model does not treat truncated content as complete.
pub const TRUNCATION_MARKER: &str = "\n\n...[TRUNCATED]";

/// Rows per table included in the prompt.
pub const MAX_TABLE_PREVIEW_ROWS: usize = 10;

/// Assemble the completion prompt. Pure and deterministic for identical
/// inputs: fixed instruction header (which enumerates the output shape the
/// normalizer expects), filename, the possibly-truncated text, the
/// heuristics as compact JSON, each table as a labeled CSV block, and a
/// closing instruction. Parts are joined by blank lines.
pub fn build_prompt(
    filename: &str,
    text: &str,
    kv: &KeyValueMap,
    tables: &TableSet,
    max_chars: usize,
) -> String {
    let mut parts: Vec<String> = vec![
        "You are a JSON generator for document extraction. Input: a block of extracted text, \
         a list of tables (as CSV) and key-value heuristics."
            .to_string(),
        "Output: a JSON with keys:".to_string(),
        "- metadata: {filename, page_count (if available)}".to_string(),
        "- fields: {field_name: {value, confidence (low/medium/high), source}}".to_string(),
        "- tables: [{name, columns: [...], rows: [[...]], detected_table_type (payments/policy terms/etc)}]"
            .to_string(),
        "- insights: [short bullets summarizing important points, risks, compliance flags]"
            .to_string(),
        "Return only valid JSON. Do not add any commentary.".to_string(),
        "---".to_string(),
        format!("FILENAME: {filename}"),
        "EXTRACTED_TEXT:".to_string(),
        truncate_text(text, max_chars),
        "KEY_VALUE_HEURISTICS:".to_string(),
        serde_json::to_string(kv).unwrap_or_else(|_| "{}".to_string()),
        "TABLES:".to_string(),
    ];

    for table in &tables.tables {
        parts.push(format!("### {}", table.name));
        match table.to_delimited(MAX_TABLE_PREVIEW_ROWS) {
            Ok(rendered) => parts.push(rendered),
            Err(_) => parts.push(format!("{table:?}")),
        }
    }

    parts.push("Return JSON.".to_string());
    parts.join("\n\n")
}

/// Cut `text` to `max_chars` characters, appending the truncation marker
/// when anything was dropped.
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let mut cut: String = text.chars().take(max_chars).collect();
    cut.push_str(TRUNCATION_MARKER);
    cut
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Table;

    fn sample_tables() -> TableSet {
        TableSet {
            tables: vec![Table {
                name: "table_1".to_string(),
                columns: vec!["item".to_string(), "amount".to_string()],
                rows: (0..15)
                    .map(|index| vec![format!("row {index}"), index.to_string()])
                    .collect(),
            }],
            diagnostics: Vec::new(),
        }
    }

    #[test]
    fn sections_appear_in_fixed_order() {
        let mut kv = KeyValueMap::new();
        kv.insert("premium".to_string(), "4,500.00".to_string());

        let prompt = build_prompt("a.pdf", "body text", &kv, &sample_tables(), 10_000);

        let filename = prompt.find("FILENAME: a.pdf").expect("filename section");
        let text = prompt.find("EXTRACTED_TEXT:").expect("text section");
        let heuristics = prompt.find("KEY_VALUE_HEURISTICS:").expect("kv section");
        let tables = prompt.find("TABLES:").expect("tables section");

        assert!(filename < text && text < heuristics && heuristics < tables);
        assert!(prompt.contains(r#"{"premium":"4,500.00"}"#));
        assert!(prompt.ends_with("Return JSON."));
    }

    #[test]
    fn table_preview_is_capped_at_ten_rows() {
        let prompt = build_prompt(
            "a.pdf",
            "",
            &KeyValueMap::new(),
            &sample_tables(),
            10_000,
        );

        assert!(prompt.contains("### table_1"));
        assert!(prompt.contains("row 9"));
        assert!(!prompt.contains("row 10"));
    }

    #[test]
    fn truncated_text_is_bounded_and_marked() {
        let long_text = "x".repeat(500);
        let truncated = truncate_text(&long_text, 100);

        assert!(truncated.ends_with(TRUNCATION_MARKER));
        assert!(truncated.chars().count() <= 100 + TRUNCATION_MARKER.chars().count());
    }

    #[test]
    fn short_text_is_untouched() {
        assert_eq!(truncate_text("short", 100), "short");
    }

    #[test]
    fn identical_inputs_build_identical_prompts() {
        let kv = KeyValueMap::new();
        let tables = TableSet::default();
        let first = build_prompt("a.pdf", "text", &kv, &tables, 50);
        let second = build_prompt("a.pdf", "text", &kv, &tables, 50);
        assert_eq!(first, second);
    }
}
