use crate::error::PipelineError;
use crate::models::{ArtifactRef, TableSet};
use crate::record::StructuredRecord;
use chrono::{DateTime, Utc};
use rust_xlsxwriter::Workbook;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const RECORD_FILENAME: &str = "llm_output.json";
pub const TABLES_FILENAME: &str = "tables_output.xlsx";

// Excel's hard limit on worksheet names.
const MAX_SHEET_NAME_LEN: usize = 31;

/// Filesystem store for downloadable run outputs. Filenames are
/// deterministic and overwritten on repeat saves; concurrent runs writing
/// the same name race with last-writer-wins, a known limitation of this
/// single-user tool.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn save_record(&self, record: &StructuredRecord) -> Result<PathBuf, PipelineError> {
        fs::create_dir_all(&self.root)?;
        let path = self.root.join(RECORD_FILENAME);
        fs::write(&path, record.to_json_pretty())?;
        info!(path = %path.display(), "saved structured record");
        Ok(path)
    }

    pub fn save_tables(&self, tables: &TableSet) -> Result<PathBuf, PipelineError> {
        fs::create_dir_all(&self.root)?;
        let path = self.root.join(TABLES_FILENAME);

        let mut workbook = Workbook::new();
        if tables.is_empty() {
            workbook.add_worksheet();
        }

        for table in &tables.tables {
            let sheet_name: String = table.name.chars().take(MAX_SHEET_NAME_LEN).collect();
            let sheet = workbook.add_worksheet();
            sheet
                .set_name(&sheet_name)
                .map_err(|error| PipelineError::Artifact(error.to_string()))?;

            for (column_index, column) in table.columns.iter().enumerate() {
                sheet
                    .write_string(0, column_index as u16, column)
                    .map_err(|error| PipelineError::Artifact(error.to_string()))?;
            }
            for (row_index, row) in table.rows.iter().enumerate() {
                for (column_index, cell) in row.iter().enumerate() {
                    sheet
                        .write_string((row_index + 1) as u32, column_index as u16, cell)
                        .map_err(|error| PipelineError::Artifact(error.to_string()))?;
                }
            }
        }

        workbook
            .save(&path)
            .map_err(|error| PipelineError::Artifact(error.to_string()))?;
        info!(path = %path.display(), tables = tables.len(), "saved tables workbook");
        Ok(path)
    }

    /// Existing artifacts, newest first by modification time.
    pub fn list(&self) -> Result<Vec<ArtifactRef>, PipelineError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut artifacts = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let metadata = entry.metadata()?;
            if !metadata.is_file() {
                continue;
            }

            let modified: DateTime<Utc> = metadata.modified()?.into();
            artifacts.push(ArtifactRef {
                name: entry.file_name().to_string_lossy().to_string(),
                path: entry.path(),
                size_bytes: metadata.len(),
                modified,
            });
        }

        artifacts.sort_by(|left, right| right.modified.cmp(&left.modified));
        Ok(artifacts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Table;
    use serde_json::json;
    use std::thread::sleep;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn record_is_saved_under_its_deterministic_name() {
        let dir = tempdir().expect("tempdir");
        let store = ArtifactStore::new(dir.path());
        let record = StructuredRecord::from_value(json!({ "insights": ["ok"] }));

        let path = store.save_record(&record).expect("save");
        assert_eq!(path.file_name().and_then(|n| n.to_str()), Some(RECORD_FILENAME));

        let written = fs::read_to_string(&path).expect("read back");
        assert!(written.contains("insights"));

        // Repeat save overwrites in place.
        let again = store.save_record(&record).expect("second save");
        assert_eq!(path, again);
    }

    #[test]
    fn tables_workbook_is_written() {
        let dir = tempdir().expect("tempdir");
        let store = ArtifactStore::new(dir.path());
        let tables = TableSet {
            tables: vec![Table {
                name: "table_1_with_an_unreasonably_long_name".to_string(),
                columns: vec!["a".to_string()],
                rows: vec![vec!["1".to_string()]],
            }],
            diagnostics: Vec::new(),
        };

        let path = store.save_tables(&tables).expect("save");
        assert_eq!(path.file_name().and_then(|n| n.to_str()), Some(TABLES_FILENAME));
        assert!(path.exists());
    }

    #[test]
    fn listing_is_newest_first() {
        let dir = tempdir().expect("tempdir");
        let store = ArtifactStore::new(dir.path());

        fs::write(dir.path().join("older.json"), b"{}").expect("write older");
        sleep(Duration::from_millis(25));
        fs::write(dir.path().join("newer.json"), b"{}").expect("write newer");

        let listed = store.list().expect("list");
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].name, "newer.json");
        assert_eq!(listed[1].name, "older.json");
    }

    #[test]
    fn listing_a_missing_root_is_empty() {
        let store = ArtifactStore::new("/definitely/not/a/real/dir");
        assert!(store.list().expect("list").is_empty());
    }
}
