use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::PathBuf;

/// Heuristic key-value pairs keyed by lower-cased free-text field names.
/// Regex-pattern results overwrite line-scan results on key collision.
pub type KeyValueMap = BTreeMap<String, String>;

/// A table pulled out of a PDF, with its ordinal name (`table_1`, `table_2`,
/// ...) assigned in detection order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Render the header plus up to `max_rows` data rows as CSV text.
    pub fn to_delimited(&self, max_rows: usize) -> Result<String, std::fmt::Error> {
        let mut out = String::new();
        writeln!(out, "{}", csv_line(&self.columns))?;
        for row in self.rows.iter().take(max_rows) {
            writeln!(out, "{}", csv_line(row))?;
        }
        Ok(out)
    }
}

fn csv_line(cells: &[String]) -> String {
    cells
        .iter()
        .map(|cell| csv_field(cell))
        .collect::<Vec<_>>()
        .join(",")
}

fn csv_field(cell: &str) -> String {
    if cell.contains([',', '"', '\n']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

/// Tables detected in one document, in detection order, plus diagnostics
/// from backends that failed or came up empty along the way.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableSet {
    pub tables: Vec<Table>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<String>,
}

impl TableSet {
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }
}

/// A persisted output file, listed newest first by the artifact store.
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactRef {
    pub name: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub modified: DateTime<Utc>,
}

/// Knobs for the line-scan heuristic. The key-length bound guards against
/// splitting prose sentences that happen to contain a colon; it is an
/// empirical threshold, not an invariant.
#[derive(Debug, Clone)]
pub struct HeuristicOptions {
    pub max_key_len: usize,
}

impl Default for HeuristicOptions {
    fn default() -> Self {
        Self { max_key_len: 40 }
    }
}
