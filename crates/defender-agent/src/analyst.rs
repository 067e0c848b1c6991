use std::sync::Arc;

use defender_core::{
    config::Config,
    llm::{GenerateRequest, InlineData, LlmBackend, LlmError},
    normalize::parse_model_json,
    retry::{retry_on_rate_limit, RetryPolicy},
};
use defender_domains::{
    build_contract_prompt, build_evidence_prompt, build_translation_prompt, CONTRACT_SYSTEM,
};
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::gemini::GeminiBackend;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error("Invalid JSON from AI: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

impl AnalysisError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::Llm(e) if e.is_rate_limited())
    }
}

/// Drives prompt, backoff and JSON cleanup for each model-backed operation.
/// Results are passed through as untyped JSON.
pub struct Analyst {
    backend: Arc<dyn LlmBackend>,
    analyze_retry: RetryPolicy,
    llm_retry: RetryPolicy,
}

impl Analyst {
    pub fn new(backend: Arc<dyn LlmBackend>) -> Self {
        Self {
            backend,
            analyze_retry: RetryPolicy::fixed(std::time::Duration::from_secs(17), 1),
            llm_retry: RetryPolicy::exponential(),
        }
    }

    /// Gemini-backed analyst, or `None` when no API key is configured.
    pub fn from_config(config: &Config) -> Option<Self> {
        if !config.gemini_configured() {
            return None;
        }
        let backend = Arc::new(GeminiBackend::from_config(config));
        Some(Self::new(backend).with_retry(config.analyze_retry(), config.llm_retry()))
    }

    pub fn with_retry(mut self, analyze: RetryPolicy, other: RetryPolicy) -> Self {
        self.analyze_retry = analyze;
        self.llm_retry = other;
        self
    }

    pub fn model_name(&self) -> &str {
        self.backend.model_name()
    }

    async fn call(
        &self,
        label: &str,
        policy: &RetryPolicy,
        request: GenerateRequest,
    ) -> Result<Value, AnalysisError> {
        let backend = &self.backend;
        let request = &request;
        let text = retry_on_rate_limit(policy, label, || backend.generate(request)).await?;
        parse_model_json(&text).map_err(|e| {
            warn!(call = label, response_chars = text.len(), "model returned invalid JSON: {e}");
            AnalysisError::InvalidJson(e)
        })
    }

    pub async fn analyze_contract(
        &self,
        contract_type: Option<&str>,
        contract_text: &str,
    ) -> Result<Value, AnalysisError> {
        info!(
            contract_type = contract_type.unwrap_or("lease"),
            chars = contract_text.len(),
            "analyzing contract"
        );
        let request = GenerateRequest::json(build_contract_prompt(contract_type, contract_text))
            .with_system(CONTRACT_SYSTEM);
        self.call("analyze-contract", &self.analyze_retry, request).await
    }

    /// Re-run a prior analysis through the model in `language`.
    pub async fn translate(&self, analysis: &Value, language: &str) -> Result<Value, AnalysisError> {
        info!(language, "translating analysis");
        let request = GenerateRequest::json(build_translation_prompt(analysis, language));
        self.call("translate", &self.llm_retry, request).await
    }

    pub async fn analyze_evidence(
        &self,
        evidence: Vec<InlineData>,
        context: Option<&str>,
        lease_text: Option<&str>,
    ) -> Result<Value, AnalysisError> {
        info!(
            files = evidence.len(),
            has_lease = lease_text.is_some_and(|t| !t.trim().is_empty()),
            "analyzing evidence"
        );
        let request = GenerateRequest::json(build_evidence_prompt(context, lease_text))
            .with_attachments(evidence);
        self.call("analyze-evidence", &self.llm_retry, request).await
    }
}
