use thiserror::Error;

/// Errors raised while pulling text or tables out of a PDF.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("{subject} is misconfigured: {detail}")]
    Configuration { subject: String, detail: String },

    #[error("ocr failed: {0}")]
    OcrFailed(String),
}

/// Errors that terminate a pipeline run. Soft failures (a table backend
/// giving up, an unparseable model reply) never surface here; they degrade
/// to empty tables or a raw-text fallback record instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{subject} is misconfigured: {detail}")]
    Configuration { subject: String, detail: String },

    #[error("completion service call failed: {0}")]
    Service(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialize error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("artifact write failed: {0}")]
    Artifact(String),

    #[error("extraction error: {0}")]
    Extract(#[from] ExtractError),
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
