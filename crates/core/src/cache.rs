use crate::error::ExtractError;
use crate::models::TableSet;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Content hash identifying a document regardless of its path.
pub fn document_fingerprint(path: &Path) -> Result<String, ExtractError> {
    let bytes = fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

/// Memoization for the two heavy extraction steps, keyed by document
/// fingerprint (text additionally by the OCR flag, since forcing OCR
/// changes the result). Invalidation is caller-controlled via `clear`;
/// nothing expires implicitly.
#[derive(Debug, Default)]
pub struct ExtractionCache {
    text: HashMap<(String, bool), String>,
    tables: HashMap<String, TableSet>,
}

impl ExtractionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self, fingerprint: &str, force_ocr: bool) -> Option<&String> {
        self.text.get(&(fingerprint.to_string(), force_ocr))
    }

    pub fn store_text(&mut self, fingerprint: String, force_ocr: bool, text: String) {
        self.text.insert((fingerprint, force_ocr), text);
    }

    pub fn tables(&self, fingerprint: &str) -> Option<&TableSet> {
        self.tables.get(fingerprint)
    }

    pub fn store_tables(&mut self, fingerprint: String, tables: TableSet) {
        self.tables.insert(fingerprint, tables);
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.tables.clear();
    }
}
