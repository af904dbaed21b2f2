use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Coarse reliability tier the model attaches to an extracted field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    /// Lenient parse of the model's label; unknown labels rank lowest.
    pub fn parse(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "high" => Confidence::High,
            "medium" | "med" => Confidence::Medium,
            _ => Confidence::Low,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldEntry {
    pub value: String,
    pub confidence: Confidence,
    pub source: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordMetadata {
    pub filename: Option<String>,
    pub page_count: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordTable {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub detected_table_type: Option<String>,
}

/// The normalized pipeline output.
///
/// The model's reply is schema-less by contract, so this wraps the parsed
/// JSON value and exposes lenient accessors: `metadata`, `fields`, `tables`
/// and `insights` are each independently optional and default to empty when
/// absent or malformed. A reply that could not be parsed at all is held as
/// `{"llm_text": <raw reply>}`.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredRecord {
    raw: Value,
}

impl StructuredRecord {
    pub fn from_value(value: Value) -> Self {
        Self { raw: value }
    }

    /// Degraded record carrying the unparseable reply verbatim.
    pub fn fallback(raw_reply: &str) -> Self {
        Self {
            raw: json!({ "llm_text": raw_reply }),
        }
    }

    pub fn llm_text(&self) -> Option<&str> {
        self.raw.get("llm_text").and_then(Value::as_str)
    }

    pub fn as_value(&self) -> &Value {
        &self.raw
    }

    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(&self.raw).unwrap_or_else(|_| self.raw.to_string())
    }

    pub fn metadata(&self) -> RecordMetadata {
        let Some(meta) = self.raw.get("metadata").and_then(Value::as_object) else {
            return RecordMetadata::default();
        };

        RecordMetadata {
            filename: meta
                .get("filename")
                .and_then(Value::as_str)
                .map(str::to_string),
            page_count: meta.get("page_count").and_then(Value::as_u64),
        }
    }

    /// Field entries; a non-mapping `fields` value yields zero entries.
    /// A field given as a bare scalar instead of `{value, confidence,
    /// source}` is kept with its display form and lowest confidence.
    pub fn fields(&self) -> BTreeMap<String, FieldEntry> {
        let Some(fields) = self.raw.get("fields").and_then(Value::as_object) else {
            return BTreeMap::new();
        };

        fields
            .iter()
            .map(|(name, value)| (name.clone(), field_entry(value)))
            .collect()
    }

    /// Tables the model returned; non-list shapes and non-object items
    /// are dropped.
    pub fn tables(&self) -> Vec<RecordTable> {
        let Some(tables) = self.raw.get("tables").and_then(Value::as_array) else {
            return Vec::new();
        };

        tables
            .iter()
            .enumerate()
            .filter_map(|(index, value)| {
                let table = value.as_object()?;
                Some(RecordTable {
                    name: table
                        .get("name")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("table_{}", index + 1)),
                    columns: string_list(table.get("columns")),
                    rows: table
                        .get("rows")
                        .and_then(Value::as_array)
                        .map(|rows| {
                            rows.iter()
                                .map(|row| string_list(Some(row)))
                                .collect()
                        })
                        .unwrap_or_default(),
                    detected_table_type: table
                        .get("detected_table_type")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                })
            })
            .collect()
    }

    pub fn insights(&self) -> Vec<String> {
        string_list(self.raw.get("insights"))
    }
}

fn field_entry(value: &Value) -> FieldEntry {
    match value.as_object() {
        Some(entry) => FieldEntry {
            value: entry
                .get("value")
                .map(display_string)
                .unwrap_or_default(),
            confidence: entry
                .get("confidence")
                .and_then(Value::as_str)
                .map(Confidence::parse)
                .unwrap_or(Confidence::Low),
            source: entry
                .get("source")
                .and_then(Value::as_str)
                .map(str::to_string),
        },
        None => FieldEntry {
            value: display_string(value),
            confidence: Confidence::Low,
            source: None,
        },
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().map(display_string).collect())
        .unwrap_or_default()
}

fn display_string(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
