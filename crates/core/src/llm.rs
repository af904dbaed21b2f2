use crate::error::PipelineError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub const DEFAULT_GROQ_MODEL: &str = "llama-3.3-70b-versatile";
pub const GROQ_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

/// Generation knobs passed through to the completion service.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GenerationParams {
    /// Sampling temperature in [0, 1]. Zero keeps repeated runs close to
    /// idempotent, up to the provider's own determinism.
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            max_tokens: 1500,
        }
    }
}

/// The completion-service seam: prompt in, reply text out. One call per
/// pipeline run, no retry policy here.
#[async_trait]
pub trait CompletionService {
    async fn complete(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, PipelineError>;
}

/// Groq chat-completions client (OpenAI-compatible wire format).
pub struct GroqClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl GroqClient {
    /// Build from `GROQ_API_KEY` and optional `GROQ_MODEL`. A missing key
    /// is a hard startup failure rather than a per-call error.
    pub fn from_env() -> Result<Self, PipelineError> {
        let api_key = require_api_key(std::env::var("GROQ_API_KEY").ok())?;
        let model = std::env::var("GROQ_MODEL")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_GROQ_MODEL.to_string());

        Ok(Self::new(GROQ_API_URL, api_key, model))
    }

    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

fn require_api_key(raw: Option<String>) -> Result<String, PipelineError> {
    raw.map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| PipelineError::Configuration {
            subject: "GROQ_API_KEY".to_string(),
            detail: "environment variable is missing or empty; export your Groq API key \
                     before starting"
                .to_string(),
        })
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ChatReplyMessage {
    content: String,
}

#[async_trait]
impl CompletionService for GroqClient {
    async fn complete(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, PipelineError> {
        let payload = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::Service(format!(
                "completion request returned {status}: {}",
                body.trim()
            )));
        }

        let reply: ChatResponse = response.json().await?;
        reply
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| {
                PipelineError::Service("completion response had no choices".to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_api_key_is_a_configuration_error() {
        match require_api_key(None) {
            Err(PipelineError::Configuration { subject, detail }) => {
                assert_eq!(subject, "GROQ_API_KEY");
                assert!(detail.contains("missing"));
            }
            other => panic!("expected configuration error, got {other:?}"),
        }
    }

    #[test]
    fn whitespace_api_key_is_rejected() {
        assert!(require_api_key(Some("   ".to_string())).is_err());
    }

    #[test]
    fn api_key_is_trimmed() {
        let key = require_api_key(Some("  gsk_abc  ".to_string())).expect("key accepted");
        assert_eq!(key, "gsk_abc");
    }

    #[test]
    fn chat_response_tolerates_missing_choices() {
        let parsed: ChatResponse = serde_json::from_str("{}").expect("parse");
        assert!(parsed.choices.is_empty());
    }
}
