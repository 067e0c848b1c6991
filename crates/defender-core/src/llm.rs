use async_trait::async_trait;
use thiserror::Error;

use crate::retry::is_rate_limited;

/// Binary content sent alongside the prompt (photos, video clips).
#[derive(Debug, Clone)]
pub struct InlineData {
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// One generation call: optional system instruction, the prompt text, and
/// any inline media.
#[derive(Debug, Clone, Default)]
pub struct GenerateRequest {
    pub system: Option<String>,
    pub prompt: String,
    pub attachments: Vec<InlineData>,
    /// Ask the model for `application/json` output.
    pub json_output: bool,
}

impl GenerateRequest {
    pub fn json(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            json_output: true,
            ..Default::default()
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_attachments(mut self, attachments: Vec<InlineData>) -> Self {
        self.attachments = attachments;
        self
    }
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("GEMINI_API_KEY not set")]
    MissingApiKey,
    #[error("429 Too Many Requests: {0}")]
    RateLimited(String),
    #[error("Gemini API error ({status}): {message}")]
    Upstream { status: u16, message: String },
    #[error("Empty response from Gemini")]
    EmptyResponse,
    #[error("request to model failed: {0}")]
    Transport(String),
}

impl LlmError {
    /// Upstream failures whose status or message indicate rate limiting.
    pub fn is_rate_limited(&self) -> bool {
        match self {
            Self::RateLimited(_) => true,
            Self::Upstream { status, message } => *status == 429 || is_rate_limited(message),
            Self::Transport(message) => is_rate_limited(message),
            Self::MissingApiKey | Self::EmptyResponse => false,
        }
    }
}

#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Return the raw text of the first candidate.
    async fn generate(&self, request: &GenerateRequest) -> Result<String, LlmError>;

    fn model_name(&self) -> &str;
}
