use crate::error::ExtractError;
use crate::extractor::extract_text_layer;
use crate::models::{Table, TableSet};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Column names plus rows, before an ordinal name is assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// One table-detection strategy. Different PDF layouts favor different
/// algorithms, so strategies are tried in order and the first one that
/// finds tables wins.
pub trait TableBackend {
    fn name(&self) -> &'static str;

    fn extract_tables(&self, path: &Path) -> Result<Vec<DetectedTable>, ExtractError>;
}

/// Best-effort table extraction: try each default backend in order, log and
/// skip failures, return an empty set when every backend fails or comes up
/// empty. Never errors; availability is traded for completeness here.
pub fn best_effort_tables(path: &Path) -> TableSet {
    best_effort_tables_with(path, &default_backends())
}

pub fn default_backends() -> Vec<Box<dyn TableBackend + Send + Sync>> {
    vec![
        Box::new(WhitespaceColumnBackend),
        Box::new(DelimiterBackend),
    ]
}

/// Try `backends` in order and return the first non-empty result. An Ok
/// result with zero tables counts as a miss and falls through to the next
/// backend, same as a failure; both leave a diagnostic behind.
pub fn best_effort_tables_with(
    path: &Path,
    backends: &[Box<dyn TableBackend + Send + Sync>],
) -> TableSet {
    let mut diagnostics = Vec::new();

    for backend in backends {
        match backend.extract_tables(path) {
            Ok(detected) if !detected.is_empty() => {
                debug!(
                    backend = backend.name(),
                    tables = detected.len(),
                    "table backend succeeded"
                );
                return TableSet {
                    tables: assign_ordinal_names(detected),
                    diagnostics,
                };
            }
            Ok(_) => {
                diagnostics.push(format!("{}: no tables detected", backend.name()));
            }
            Err(error) => {
                warn!(backend = backend.name(), %error, "table backend failed, trying next");
                diagnostics.push(format!("{}: {error}", backend.name()));
            }
        }
    }

    TableSet {
        tables: Vec::new(),
        diagnostics,
    }
}

/// Ordinal names are 1-based, contiguous, and reset per call; only one
/// backend's results ever feed a single call.
fn assign_ordinal_names(detected: Vec<DetectedTable>) -> Vec<Table> {
    detected
        .into_iter()
        .enumerate()
        .map(|(index, table)| Table {
            name: format!("table_{}", index + 1),
            columns: table.columns,
            rows: table.rows,
        })
        .collect()
}

/// Stream-style detection over the digital text layer: runs of two or more
/// spaces (or tabs) act as column gaps, and a block of consecutive lines
/// with the same cell count of at least two is a table. The first line of a
/// block is its header.
pub struct WhitespaceColumnBackend;

impl TableBackend for WhitespaceColumnBackend {
    fn name(&self) -> &'static str {
        "whitespace-columns"
    }

    fn extract_tables(&self, path: &Path) -> Result<Vec<DetectedTable>, ExtractError> {
        let text = extract_text_layer(path)?;
        Ok(detect_whitespace_tables(&text))
    }
}

/// Detection for explicitly delimited layouts: consecutive lines split by a
/// pipe character into the same cell count. Dash-only separator rows (as in
/// Markdown-style tables) are skipped.
pub struct DelimiterBackend;

impl TableBackend for DelimiterBackend {
    fn name(&self) -> &'static str {
        "pipe-delimited"
    }

    fn extract_tables(&self, path: &Path) -> Result<Vec<DetectedTable>, ExtractError> {
        let text = extract_text_layer(path)?;
        Ok(detect_delimited_tables(&text))
    }
}

const MIN_TABLE_COLUMNS: usize = 2;
const MIN_TABLE_ROWS: usize = 2;

pub(crate) fn detect_whitespace_tables(text: &str) -> Vec<DetectedTable> {
    collect_blocks(text, split_whitespace_columns)
}

pub(crate) fn detect_delimited_tables(text: &str) -> Vec<DetectedTable> {
    collect_blocks(text, split_pipe_columns)
}

enum LineKind {
    /// A columnar line contributing cells to the current block.
    Cells(Vec<String>),
    /// A decorative line (Markdown separator row) that neither extends nor
    /// breaks the block.
    Separator,
    /// Ordinary prose; ends the current block.
    Plain,
}

fn collect_blocks(text: &str, classify: fn(&str) -> LineKind) -> Vec<DetectedTable> {
    let mut tables = Vec::new();
    let mut block: Vec<Vec<String>> = Vec::new();

    for line in text.lines() {
        match classify(line) {
            LineKind::Cells(cells) if block.is_empty() || cells.len() == block[0].len() => {
                block.push(cells);
            }
            LineKind::Cells(cells) => {
                flush_block(&mut block, &mut tables);
                block.push(cells);
            }
            LineKind::Separator => {}
            LineKind::Plain => flush_block(&mut block, &mut tables),
        }
    }
    flush_block(&mut block, &mut tables);

    tables
}

fn flush_block(block: &mut Vec<Vec<String>>, tables: &mut Vec<DetectedTable>) {
    // Header plus at least MIN_TABLE_ROWS data rows; shorter blocks are
    // usually wrapped prose, not tables.
    if block.len() > MIN_TABLE_ROWS {
        let mut rows = std::mem::take(block);
        let columns = rows.remove(0);
        tables.push(DetectedTable { columns, rows });
    } else {
        block.clear();
    }
}

fn split_whitespace_columns(line: &str) -> LineKind {
    static GAP: OnceLock<Option<Regex>> = OnceLock::new();
    let Some(gap) = GAP.get_or_init(|| Regex::new(r"\s{2,}|\t").ok()).as_ref() else {
        return LineKind::Plain;
    };

    let trimmed = line.trim();
    if trimmed.is_empty() {
        return LineKind::Plain;
    }

    let cells: Vec<String> = gap
        .split(trimmed)
        .map(|cell| cell.trim().to_string())
        .filter(|cell| !cell.is_empty())
        .collect();

    if cells.len() >= MIN_TABLE_COLUMNS {
        LineKind::Cells(cells)
    } else {
        LineKind::Plain
    }
}

fn split_pipe_columns(line: &str) -> LineKind {
    let trimmed = line.trim();
    if !trimmed.contains('|') {
        return LineKind::Plain;
    }

    let cells: Vec<String> = trimmed
        .trim_matches('|')
        .split('|')
        .map(|cell| cell.trim().to_string())
        .collect();

    if cells.iter().any(String::is_empty) || cells.len() < MIN_TABLE_COLUMNS {
        return LineKind::Plain;
    }

    // Markdown-style separator rows carry no data.
    if cells
        .iter()
        .all(|cell| cell.chars().all(|character| "-: ".contains(character)))
    {
        return LineKind::Separator;
    }

    LineKind::Cells(cells)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingBackend;

    impl TableBackend for FailingBackend {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn extract_tables(&self, _path: &Path) -> Result<Vec<DetectedTable>, ExtractError> {
            Err(ExtractError::PdfParse("backend dependency missing".into()))
        }
    }

    struct OneTableBackend;

    impl TableBackend for OneTableBackend {
        fn name(&self) -> &'static str {
            "one-table"
        }

        fn extract_tables(&self, _path: &Path) -> Result<Vec<DetectedTable>, ExtractError> {
            Ok(vec![DetectedTable {
                columns: vec!["a".to_string(), "b".to_string()],
                rows: vec![vec!["1".to_string(), "2".to_string()]],
            }])
        }
    }

    struct EmptyBackend;

    impl TableBackend for EmptyBackend {
        fn name(&self) -> &'static str {
            "empty"
        }

        fn extract_tables(&self, _path: &Path) -> Result<Vec<DetectedTable>, ExtractError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn fallback_uses_secondary_when_primary_fails() {
        let backends: Vec<Box<dyn TableBackend + Send + Sync>> =
            vec![Box::new(FailingBackend), Box::new(OneTableBackend)];

        let set = best_effort_tables_with(Path::new("ignored.pdf"), &backends);

        assert_eq!(set.len(), 1);
        assert_eq!(set.tables[0].name, "table_1");
        assert_eq!(set.tables[0].columns, vec!["a", "b"]);
        assert_eq!(set.diagnostics.len(), 1);
        assert!(set.diagnostics[0].starts_with("failing:"));
    }

    #[test]
    fn total_failure_returns_empty_set_with_diagnostics() {
        let backends: Vec<Box<dyn TableBackend + Send + Sync>> =
            vec![Box::new(FailingBackend), Box::new(EmptyBackend)];

        let set = best_effort_tables_with(Path::new("ignored.pdf"), &backends);

        assert!(set.is_empty());
        assert_eq!(set.diagnostics.len(), 2);
    }

    #[test]
    fn ordinal_names_are_one_based_and_contiguous() {
        let tables = assign_ordinal_names(vec![
            DetectedTable {
                columns: vec!["x".to_string()],
                rows: Vec::new(),
            },
            DetectedTable {
                columns: vec!["y".to_string()],
                rows: Vec::new(),
            },
        ]);

        assert_eq!(tables[0].name, "table_1");
        assert_eq!(tables[1].name, "table_2");
    }

    #[test]
    fn whitespace_columns_form_a_table() {
        let text = "Summary of payments\n\
                    Item        Amount    Due\n\
                    Premium     4,500.00  2024-01-15\n\
                    Tax         120.00    2024-01-15\n\
                    \n\
                    Closing remarks follow here.";

        let tables = detect_whitespace_tables(text);

        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].columns, vec!["Item", "Amount", "Due"]);
        assert_eq!(tables[0].rows.len(), 2);
        assert_eq!(tables[0].rows[1][0], "Tax");
    }

    #[test]
    fn short_blocks_are_not_tables() {
        let text = "Name        Value\nOnly        OneRow";
        assert!(detect_whitespace_tables(text).is_empty());
    }

    #[test]
    fn pipe_delimited_block_parses_and_skips_separator_row() {
        let text = "| Item | Amount |\n| --- | --- |\n| Premium | 4500 |\n| Tax | 120 |";

        let tables = detect_delimited_tables(text);

        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].columns, vec!["Item", "Amount"]);
        assert_eq!(tables[0].rows.len(), 2);
    }

    #[test]
    fn column_count_change_starts_a_new_block() {
        let text = "a  b\nc  d\ne  f\nx  y  z\np  q  r\ns  t  u";

        let tables = detect_whitespace_tables(text);

        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].columns.len(), 2);
        assert_eq!(tables[1].columns.len(), 3);
    }
}
