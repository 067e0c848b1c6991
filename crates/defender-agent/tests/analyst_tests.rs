use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use defender_agent::{AnalysisError, Analyst};
use defender_core::llm::{GenerateRequest, InlineData, LlmBackend, LlmError};
use defender_core::retry::RetryPolicy;
use serde_json::json;
use tracing_test::traced_test;

/// Replays canned responses and records every request it sees.
struct Scripted {
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
    seen: Mutex<Vec<GenerateRequest>>,
}

impl Scripted {
    fn new(replies: Vec<Result<String, LlmError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    fn last(&self) -> GenerateRequest {
        self.seen.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl LlmBackend for Scripted {
    async fn generate(&self, request: &GenerateRequest) -> Result<String, LlmError> {
        self.seen.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(LlmError::EmptyResponse))
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

fn analyst(backend: Arc<Scripted>) -> Analyst {
    Analyst::new(backend).with_retry(
        RetryPolicy::fixed(Duration::ZERO, 1),
        RetryPolicy::fixed(Duration::ZERO, 3),
    )
}

fn rate_limited() -> Result<String, LlmError> {
    Err(LlmError::RateLimited("Resource has been exhausted".into()))
}

// ── Contract analysis ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_fenced_response_is_parsed() {
    let backend = Scripted::new(vec![Ok("```json\n{\"riskScore\":{\"overall\":58}}\n```".into())]);
    let result = analyst(backend.clone())
        .analyze_contract(Some("lease"), "Monthly rent $975")
        .await
        .unwrap();
    assert_eq!(result["riskScore"]["overall"], 58);

    let req = backend.last();
    assert!(req.json_output);
    assert!(req.system.unwrap().contains("expert legal contract analyzer"));
    assert!(req.prompt.ends_with("Monthly rent $975"));
}

#[tokio::test]
#[traced_test]
async fn test_contract_retries_once_on_rate_limit() {
    let backend = Scripted::new(vec![rate_limited(), Ok("{}".into())]);
    let result = analyst(backend.clone()).analyze_contract(None, "text").await;
    assert!(result.is_ok());
    assert_eq!(backend.calls(), 2);
    assert!(logs_contain("rate limited, backing off"));
}

#[tokio::test]
async fn test_contract_gives_up_after_single_retry() {
    let backend = Scripted::new(vec![rate_limited(), rate_limited(), Ok("{}".into())]);
    let err = analyst(backend.clone())
        .analyze_contract(None, "text")
        .await
        .unwrap_err();
    assert!(err.is_rate_limited());
    assert_eq!(backend.calls(), 2);
}

#[tokio::test]
async fn test_other_errors_are_not_retried() {
    let backend = Scripted::new(vec![
        Err(LlmError::Upstream {
            status: 400,
            message: "API key not valid".into(),
        }),
        Ok("{}".into()),
    ]);
    let err = analyst(backend.clone())
        .analyze_contract(None, "text")
        .await
        .unwrap_err();
    assert!(!err.is_rate_limited());
    assert_eq!(backend.calls(), 1);
}

#[tokio::test]
async fn test_invalid_json_is_reported() {
    let backend = Scripted::new(vec![Ok("Sorry, I can't help with that.".into())]);
    let err = analyst(backend).analyze_contract(None, "text").await.unwrap_err();
    assert!(matches!(err, AnalysisError::InvalidJson(_)));
}

// ── Translation & evidence ──────────────────────────────────────────────────

#[tokio::test]
async fn test_translate_uses_longer_schedule() {
    let backend = Scripted::new(vec![
        rate_limited(),
        rate_limited(),
        rate_limited(),
        Ok(r#"{"totalSavings":"$111+ al año"}"#.into()),
    ]);
    let input = json!({"totalSavings": "$111+ annually"});
    let out = analyst(backend.clone()).translate(&input, "Spanish").await.unwrap();
    assert_eq!(out["totalSavings"], "$111+ al año");
    assert_eq!(backend.calls(), 4);
    assert!(backend.last().prompt.contains("to Spanish"));
}

#[tokio::test]
async fn test_evidence_sends_media_inline() {
    let backend = Scripted::new(vec![Ok(r#"{"diagnosis":{"issue":"Black mold"}}"#.into())]);
    let photo = InlineData {
        mime_type: "image/jpeg".into(),
        data: vec![0xff, 0xd8, 0xff],
    };
    let out = analyst(backend.clone())
        .analyze_evidence(vec![photo], Some("Bathroom ceiling"), None)
        .await
        .unwrap();
    assert_eq!(out["diagnosis"]["issue"], "Black mold");

    let req = backend.last();
    assert_eq!(req.attachments.len(), 1);
    assert_eq!(req.attachments[0].mime_type, "image/jpeg");
    assert!(req.prompt.contains("No lease provided"));
    assert!(req.system.is_none());
}
