pub mod artifacts;
pub mod cache;
pub mod error;
pub mod extractor;
pub mod heuristics;
pub mod llm;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod prompt;
pub mod record;
pub mod tables;

pub use artifacts::{ArtifactStore, RECORD_FILENAME, TABLES_FILENAME};
pub use cache::{document_fingerprint, ExtractionCache};
pub use error::{ExtractError, PipelineError};
pub use extractor::{extract_text_layer, OcrOptions, TextExtractor, DEFAULT_OCR_DPI};
pub use heuristics::extract_key_values;
pub use llm::{
    CompletionService, GenerationParams, GroqClient, DEFAULT_GROQ_MODEL, GROQ_API_URL,
};
pub use models::{ArtifactRef, HeuristicOptions, KeyValueMap, Table, TableSet};
pub use normalize::{normalize_reply, outermost_json_span};
pub use pipeline::{DocumentPipeline, RunOptions, RunOutcome};
pub use prompt::{build_prompt, truncate_text, MAX_TABLE_PREVIEW_ROWS, TRUNCATION_MARKER};
pub use record::{Confidence, FieldEntry, RecordMetadata, RecordTable, StructuredRecord};
pub use tables::{
    best_effort_tables, best_effort_tables_with, default_backends, DelimiterBackend,
    DetectedTable, TableBackend, WhitespaceColumnBackend,
};
