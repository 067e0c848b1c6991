use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use defender_core::{
    config::Config,
    llm::{GenerateRequest, LlmBackend, LlmError},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

/// Calls Gemini's `generateContent` REST endpoint.
///
/// One request per call; rate-limit handling lives in the caller so each
/// operation can pick its own backoff.
pub struct GeminiBackend {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
    pub timeout_secs: u64,
    client: reqwest::Client,
}

impl GeminiBackend {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: defender_core::config::DEFAULT_GEMINI_BASE_URL.into(),
            temperature: 0.3,
            timeout_secs: 120,
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.gemini_api_key.clone(), config.gemini_model.clone())
            .with_base_url(config.gemini_base_url.clone())
            .with_temperature(config.gemini_temperature)
            .with_timeout(config.gemini_timeout_s)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url.trim_end_matches('/'),
            self.model,
            urlencoding::encode(&self.api_key)
        )
    }
}

#[derive(Serialize)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<Blob>,
}

#[derive(Serialize)]
struct Blob {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
}

#[derive(Serialize)]
struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct GenerateContentResponse {
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct CandidateContent {
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct CandidatePart {
    text: Option<String>,
}

fn text_part(text: &str) -> Part {
    Part {
        text: Some(text.to_string()),
        inline_data: None,
    }
}

fn build_body(request: &GenerateRequest, temperature: f32) -> GenerateContentRequest {
    let mut parts = vec![text_part(&request.prompt)];
    parts.extend(request.attachments.iter().map(|a| Part {
        text: None,
        inline_data: Some(Blob {
            mime_type: a.mime_type.clone(),
            data: STANDARD.encode(&a.data),
        }),
    }));
    GenerateContentRequest {
        system_instruction: request.system.as_deref().map(|s| Content {
            parts: vec![text_part(s)],
        }),
        contents: vec![Content { parts }],
        generation_config: GenerationConfig {
            temperature,
            response_mime_type: request.json_output.then_some("application/json"),
        },
    }
}

/// Concatenated text of the first candidate, or `None` when it has none.
fn first_candidate_text(body: &str) -> Option<String> {
    let resp: GenerateContentResponse = serde_json::from_str(body).ok()?;
    let candidate = resp.candidates.into_iter().next()?;
    let text: String = candidate
        .content
        .parts
        .into_iter()
        .filter_map(|p| p.text)
        .collect();
    (!text.trim().is_empty()).then_some(text)
}

/// `error.message` from a Gemini error body, falling back to `error.code`
/// and then the raw body.
fn error_message(body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let err = parsed.as_ref().and_then(|v| v.get("error"));
    if let Some(msg) = err.and_then(|e| e["message"].as_str()) {
        return msg.to_string();
    }
    if let Some(code) = err.and_then(|e| e.get("code")).filter(|c| !c.is_null()) {
        return code.to_string();
    }
    if body.trim().is_empty() {
        "Unknown error".into()
    } else {
        body.trim().to_string()
    }
}

fn classify(status: u16, body: &str) -> LlmError {
    let message = error_message(body);
    if status == 429 {
        LlmError::RateLimited(message)
    } else {
        LlmError::Upstream { status, message }
    }
}

#[async_trait]
impl LlmBackend for GeminiBackend {
    async fn generate(&self, request: &GenerateRequest) -> Result<String, LlmError> {
        if self.api_key.is_empty() {
            return Err(LlmError::MissingApiKey);
        }
        let body = build_body(request, self.temperature);

        info!(
            model = %self.model,
            prompt_chars = request.prompt.len(),
            attachments = request.attachments.len(),
            "calling gemini generateContent"
        );

        let response = self
            .client
            .post(self.endpoint())
            .timeout(Duration::from_secs(self.timeout_secs))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                warn!(model = %self.model, "gemini request failed: {e}");
                LlmError::Transport(e.to_string())
            })?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        if !(200..300).contains(&status) {
            let err = classify(status, &text);
            warn!(model = %self.model, status, "gemini returned an error: {err}");
            return Err(err);
        }

        let out = first_candidate_text(&text).ok_or(LlmError::EmptyResponse)?;
        info!(model = %self.model, response_chars = out.len(), "gemini response received");
        Ok(out)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use defender_core::llm::InlineData;

    #[test]
    fn endpoint_encodes_key() {
        let b = GeminiBackend::new("a b&c", "gemini-2.5-flash-lite").with_base_url("http://localhost:9/");
        assert_eq!(
            b.endpoint(),
            "http://localhost:9/v1beta/models/gemini-2.5-flash-lite:generateContent?key=a%20b%26c"
        );
    }

    #[test]
    fn body_shape_with_system_and_media() {
        let req = GenerateRequest::json("analyze")
            .with_system("be precise")
            .with_attachments(vec![InlineData {
                mime_type: "image/jpeg".into(),
                data: b"abc".to_vec(),
            }]);
        let v = serde_json::to_value(build_body(&req, 0.3)).unwrap();
        assert_eq!(v["system_instruction"]["parts"][0]["text"], "be precise");
        assert_eq!(v["contents"][0]["parts"][0]["text"], "analyze");
        assert_eq!(v["contents"][0]["parts"][1]["inline_data"]["mime_type"], "image/jpeg");
        assert_eq!(v["contents"][0]["parts"][1]["inline_data"]["data"], "YWJj");
        assert_eq!(v["generationConfig"]["responseMimeType"], "application/json");
    }

    #[test]
    fn plain_text_request_omits_optional_fields() {
        let req = GenerateRequest {
            prompt: "hi".into(),
            ..Default::default()
        };
        let v = serde_json::to_value(build_body(&req, 0.3)).unwrap();
        assert!(v.get("system_instruction").is_none());
        assert!(v["generationConfig"].get("responseMimeType").is_none());
    }

    #[test]
    fn candidate_text_joins_parts() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"{\"a\":"},{"text":"1}"}]}}]}"#;
        assert_eq!(first_candidate_text(body).as_deref(), Some("{\"a\":1}"));
        assert_eq!(first_candidate_text(r#"{"candidates":[]}"#), None);
        assert_eq!(first_candidate_text(r#"{"promptFeedback":{}}"#), None);
    }

    #[test]
    fn errors_are_classified_by_status() {
        let body = r#"{"error":{"code":429,"message":"Resource has been exhausted (e.g. check quota)."}}"#;
        assert!(matches!(classify(429, body), LlmError::RateLimited(_)));
        match classify(400, r#"{"error":{"code":400,"message":"API key not valid"}}"#) {
            LlmError::Upstream { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "API key not valid");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(error_message(r#"{"error":{"code":503}}"#), "503");
        assert_eq!(error_message(""), "Unknown error");
    }

    #[tokio::test]
    async fn missing_key_fails_without_network() {
        let b = GeminiBackend::new("", "m");
        let err = b.generate(&GenerateRequest::json("x")).await.unwrap_err();
        assert!(matches!(err, LlmError::MissingApiKey));
    }
}
