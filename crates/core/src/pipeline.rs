use crate::artifacts::ArtifactStore;
use crate::cache::{document_fingerprint, ExtractionCache};
use crate::error::PipelineError;
use crate::extractor::TextExtractor;
use crate::heuristics::extract_key_values;
use crate::llm::{CompletionService, GenerationParams};
use crate::models::{HeuristicOptions, KeyValueMap, TableSet};
use crate::normalize::normalize_reply;
use crate::prompt::build_prompt;
use crate::record::StructuredRecord;
use crate::tables::best_effort_tables;
use std::path::{Path, PathBuf};
use tracing::info;

/// Per-run knobs. Defaults mirror the sidebar defaults of the original
/// operator tool: temperature 0, 1500 completion tokens, 40k prompt chars.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub force_ocr: bool,
    pub temperature: f32,
    pub max_tokens: u32,
    pub max_prompt_chars: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            force_ocr: false,
            temperature: 0.0,
            max_tokens: 1500,
            max_prompt_chars: 40_000,
        }
    }
}

/// Everything a run produced, including the intermediate extraction stages
/// so callers can display them.
#[derive(Debug)]
pub struct RunOutcome {
    pub record: StructuredRecord,
    pub text: String,
    pub key_values: KeyValueMap,
    pub tables: TableSet,
    pub artifacts: Vec<PathBuf>,
}

/// The single-document pipeline: text extraction (digital or OCR), table
/// extraction, heuristic key-values, prompt construction, one completion
/// call, response normalization, artifact persistence.
///
/// Stages run one after another and block the caller; rasterization+OCR and
/// the completion call are the long-latency points. Extraction results are
/// memoized per document fingerprint across runs of the same pipeline
/// instance.
pub struct DocumentPipeline<C> {
    completion: C,
    extractor: TextExtractor,
    heuristics: HeuristicOptions,
    store: ArtifactStore,
    cache: ExtractionCache,
}

impl<C: CompletionService + Send + Sync> DocumentPipeline<C> {
    pub fn new(completion: C, store: ArtifactStore) -> Self {
        Self {
            completion,
            extractor: TextExtractor::default(),
            heuristics: HeuristicOptions::default(),
            store,
            cache: ExtractionCache::new(),
        }
    }

    pub fn with_extractor(mut self, extractor: TextExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_heuristics(mut self, heuristics: HeuristicOptions) -> Self {
        self.heuristics = heuristics;
        self
    }

    /// Drop all memoized extraction results.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Run the pipeline on one document.
    ///
    /// Table extraction and response parsing degrade gracefully; only
    /// configuration problems, an OCR failure, and completion-service
    /// errors terminate the run. An empty document still ends in a
    /// structured (fallback) record.
    pub async fn run(
        &mut self,
        path: &Path,
        filename: &str,
        options: &RunOptions,
    ) -> Result<RunOutcome, PipelineError> {
        let fingerprint = document_fingerprint(path)?;

        let text = if let Some(cached) = self.cache.text(&fingerprint, options.force_ocr) {
            cached.clone()
        } else {
            let extracted = tokio::task::block_in_place(|| {
                self.extractor.extract(path, options.force_ocr)
            })?;
            self.cache
                .store_text(fingerprint.clone(), options.force_ocr, extracted.clone());
            extracted
        };

        let tables = if let Some(cached) = self.cache.tables(&fingerprint) {
            cached.clone()
        } else {
            let extracted = tokio::task::block_in_place(|| best_effort_tables(path));
            self.cache.store_tables(fingerprint.clone(), extracted.clone());
            extracted
        };

        let key_values = extract_key_values(&text, &self.heuristics);
        let prompt = build_prompt(
            filename,
            &text,
            &key_values,
            &tables,
            options.max_prompt_chars,
        );

        info!(
            filename,
            prompt_chars = prompt.len(),
            tables = tables.len(),
            heuristic_fields = key_values.len(),
            "invoking completion service"
        );

        let params = GenerationParams {
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        };
        let raw_reply = self.completion.complete(&prompt, &params).await?;
        let record = normalize_reply(&raw_reply);

        let mut artifacts = vec![self.store.save_record(&record)?];
        if !tables.is_empty() {
            artifacts.push(self.store.save_tables(&tables)?);
        }

        Ok(RunOutcome {
            record,
            text,
            key_values,
            tables,
            artifacts,
        })
    }
}
