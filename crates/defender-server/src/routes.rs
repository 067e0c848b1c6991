use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{
        multipart::{Multipart, MultipartError},
        rejection::JsonRejection,
        DefaultBodyLimit, Path, Query, State,
    },
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Json, Response,
    },
    routing::{get, post},
    Router,
};
use defender_agent::{AnalysisError, Analyst};
use defender_core::{
    evidence::{draft_memo, is_sha256_hex, secured_record},
    extract::{ensure_analyzable, extract_text},
    ledger::ReviewRejected,
    llm::{InlineData, LlmError},
    solana::{validate_pubkey, AirdropCode},
    tenancy::{filename_matches, verify_lease, TenancyCheck},
    types::ContractType,
};
use defender_domains::{language_name, samples::sample_for};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::StreamExt;
use tower_http::{
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::AppState;

// ── Errors ────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub(crate) enum ApiError {
    #[error("GEMINI_API_KEY not set")]
    MissingApiKey,
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Rate limit exceeded. Wait a minute and try again, or check your Gemini API quota: https://ai.google.dev/gemini-api/docs/rate-limits")]
    RateLimited,
    #[error("Invalid JSON from AI")]
    InvalidModelJson(String),
    #[error("{0}")]
    BadGateway(String),
    #[error("{message}")]
    Airdrop { message: String, code: AirdropCode },
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::MissingApiKey | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::InvalidModelJson(_) | Self::BadGateway(_) => StatusCode::BAD_GATEWAY,
            Self::Airdrop { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::InvalidModelJson(raw) => json!({ "error": self.to_string(), "raw": raw }),
            Self::Airdrop { message, code } => json!({ "error": message, "code": code }),
            _ => json!({ "error": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

impl From<AnalysisError> for ApiError {
    fn from(e: AnalysisError) -> Self {
        if e.is_rate_limited() {
            return Self::RateLimited;
        }
        match e {
            AnalysisError::InvalidJson(err) => Self::InvalidModelJson(err.to_string()),
            AnalysisError::Llm(LlmError::MissingApiKey) => Self::MissingApiKey,
            AnalysisError::Llm(LlmError::EmptyResponse) => {
                Self::BadGateway(LlmError::EmptyResponse.to_string())
            }
            AnalysisError::Llm(other) => internal(other),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        Self::BadRequest(format!("Invalid form data: {}", e.body_text()))
    }
}

pub(crate) fn internal(e: impl std::fmt::Display) -> ApiError {
    tracing::error!("internal error: {e}");
    ApiError::Internal(e.to_string())
}

fn analyst(state: &AppState) -> Result<&Analyst, ApiError> {
    state.analyst.as_ref().ok_or(ApiError::MissingApiKey)
}

// ── Request body types ────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AnalyzeBody {
    pub contract_text: Option<Value>,
    pub contract_type: Option<Value>,
}

#[derive(Deserialize)]
pub(crate) struct LangQuery {
    pub lang: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AirdropBody {
    pub public_key: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RecordBody {
    pub file_name: String,
    pub file_hash: String,
    pub signature: String,
}

#[derive(Deserialize)]
pub(crate) struct AddressQuery {
    pub address: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ReviewBody {
    pub address: String,
    pub rating: i64,
    pub comment: String,
    #[serde(default)]
    pub proof_of_tenancy: bool,
}

// ── Multipart ─────────────────────────────────────────────────────────────

pub(crate) struct Upload {
    pub field: String,
    pub file_name: String,
    pub mime: String,
    pub bytes: Bytes,
}

/// A fully buffered multipart form: file parts in order, text parts by name.
#[derive(Default)]
pub(crate) struct Form {
    pub files: Vec<Upload>,
    pub text: HashMap<String, String>,
}

impl Form {
    async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = Form::default();
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let mime = field.content_type().unwrap_or_default().to_string();
                    let bytes = field.bytes().await?;
                    form.files.push(Upload {
                        field: name,
                        file_name,
                        mime,
                        bytes,
                    });
                }
                None => {
                    let value = field.text().await?;
                    form.text.insert(name, value);
                }
            }
        }
        Ok(form)
    }

    fn take_file(&mut self, field: &str) -> Option<Upload> {
        let idx = self.files.iter().position(|f| f.field == field)?;
        Some(self.files.remove(idx))
    }

    fn text(&self, field: &str) -> Option<&str> {
        self.text
            .get(field)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }
}

async fn extract_upload(upload: &Upload) -> Result<String, ApiError> {
    let bytes = upload.bytes.clone();
    let mime = upload.mime.clone();
    let name = upload.file_name.clone();
    tokio::task::spawn_blocking(move || extract_text(&bytes, &mime, &name))
        .await
        .map_err(internal)?
        .map_err(|e| ApiError::BadRequest(format!("{e:#}")))
}

// ── Router ────────────────────────────────────────────────────────────────

pub(crate) fn router(state: Arc<AppState>) -> Router {
    let static_dir = state.config.static_dir.clone();
    let serve_dir = ServeDir::new(&static_dir)
        .fallback(ServeFile::new(format!("{static_dir}/index.html")));

    let json_api: Router<Arc<AppState>> = Router::new()
        // Contract scanner
        .route("/api/analyze-contract", post(analyze_contract))
        .route("/api/translate", post(translate))
        // Evidence locker
        .route("/api/request-airdrop", post(request_airdrop))
        .route("/api/evidence-locker/record", post(record_evidence))
        // Landlord radar
        .route("/api/radar/reviews", post(add_review))
        .layer(DefaultBodyLimit::max(state.config.max_json_bytes));

    let upload_api: Router<Arc<AppState>> = Router::new()
        .route("/api/extract-text", post(extract_text_route))
        .route("/api/scan-contract", post(scan_contract))
        .route("/api/analyze-evidence", post(analyze_evidence))
        .route("/api/evidence-locker/prepare", post(prepare_evidence))
        .route("/api/radar/verify-lease", post(verify_lease_route))
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes));

    Router::new()
        .route("/api/health", get(health))
        .route("/api/samples/:contract_type", get(sample))
        .route("/api/radar/properties", get(list_properties))
        .route("/api/radar/property", get(get_property))
        .route("/api/radar/coordinates", get(get_coordinates))
        .route("/api/logs", get(sse_logs))
        .merge(json_api)
        .merge(upload_api)
        .fallback_service(serve_dir)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_s": state.start_time.elapsed().as_secs(),
        "gemini_configured": state.analyst.is_some(),
        "model": state.analyst.as_ref().map(|a| a.model_name()),
    }))
}

// Contract scanner

async fn analyze_contract(
    State(state): State<Arc<AppState>>,
    body: Result<Json<AnalyzeBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let analyst = analyst(&state)?;
    let Json(body) = body?;
    let text = body
        .contract_text
        .as_ref()
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing or invalid contractText".into()))?;
    let contract_type = body.contract_type.as_ref().and_then(Value::as_str);

    let analysis = analyst.analyze_contract(contract_type, text).await?;
    Ok(Json(analysis))
}

async fn scan_contract(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let analyst = analyst(&state)?;
    let mut form = Form::read(multipart).await?;
    let upload = form
        .take_file("file")
        .ok_or_else(|| ApiError::BadRequest("No file provided".into()))?;

    let text = extract_upload(&upload).await?;
    let text = ensure_analyzable(&text).map_err(|m| ApiError::BadRequest(m.into()))?;
    info!(file = %upload.file_name, chars = text.len(), "contract text extracted");

    let analysis = analyst
        .analyze_contract(form.text("contractType"), text)
        .await?;
    Ok(Json(analysis))
}

/// `null`, `false`, zero and the empty string carry no analysis to translate.
fn is_falsy(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

async fn translate(
    State(state): State<Arc<AppState>>,
    Query(q): Query<LangQuery>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let analyst = analyst(&state)?;
    let Json(payload) = body?;
    if is_falsy(&payload) {
        return Err(ApiError::BadRequest("Missing payload".into()));
    }
    let language = language_name(q.lang.as_deref());
    Ok(Json(analyst.translate(&payload, language).await?))
}

async fn sample(Path(contract_type): Path<String>) -> Json<Value> {
    let kind = ContractType::from_str_or_lease(Some(&contract_type));
    Json(json!(sample_for(kind)))
}

async fn extract_text_route(multipart: Multipart) -> Result<Json<Value>, ApiError> {
    let mut form = Form::read(multipart).await?;
    let upload = form
        .take_file("file")
        .ok_or_else(|| ApiError::BadRequest("No file provided".into()))?;
    let text = extract_upload(&upload).await?;
    Ok(Json(json!({
        "fileName": upload.file_name,
        "chars": text.chars().count(),
        "text": text,
    })))
}

// Eviction defense

async fn analyze_evidence(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let analyst = analyst(&state)?;
    let mut form = Form::read(multipart).await?;

    let lease_file = form.take_file("lease");
    let evidence: Vec<InlineData> = form
        .files
        .iter()
        .filter(|f| f.field == "evidence")
        .map(|f| InlineData {
            mime_type: if f.mime.is_empty() {
                "application/octet-stream".into()
            } else {
                f.mime.clone()
            },
            data: f.bytes.to_vec(),
        })
        .collect();
    if evidence.is_empty() {
        return Err(ApiError::BadRequest("No evidence files provided".into()));
    }

    let mut lease_text = form.text("leaseText").map(str::to_string);
    if lease_text.is_none() {
        if let Some(upload) = lease_file {
            match extract_upload(&upload).await {
                Ok(text) => lease_text = Some(text),
                Err(e) => warn!(file = %upload.file_name, "lease extraction failed: {e}"),
            }
        }
    }

    let report = analyst
        .analyze_evidence(evidence, form.text("context"), lease_text.as_deref())
        .await?;
    Ok(Json(report))
}

// Evidence locker

async fn request_airdrop(
    State(state): State<Arc<AppState>>,
    body: Result<Json<AirdropBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = body?;
    let pubkey = body
        .public_key
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing publicKey".into()))?;
    validate_pubkey(pubkey).map_err(|e| ApiError::BadRequest(format!("Invalid publicKey: {e}")))?;

    match state.faucet.request_airdrop(pubkey).await {
        Ok(signature) => Ok(Json(json!({ "signature": signature }))),
        Err(f) => {
            warn!(code = ?f.code, "airdrop failed: {}", f.message);
            Err(ApiError::Airdrop {
                message: f.message,
                code: f.code,
            })
        }
    }
}

async fn prepare_evidence(multipart: Multipart) -> Result<Json<Value>, ApiError> {
    let mut form = Form::read(multipart).await?;
    let upload = form
        .take_file("file")
        .ok_or_else(|| ApiError::BadRequest("No file provided".into()))?;
    let draft = draft_memo(&upload.file_name, &upload.bytes);
    info!(file = %draft.file_name, hash = %draft.file_hash, "evidence hashed");
    Ok(Json(json!(draft)))
}

async fn record_evidence(
    body: Result<Json<RecordBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = body?;
    if body.file_name.trim().is_empty() || body.signature.trim().is_empty() {
        return Err(ApiError::BadRequest("fileName and signature are required".into()));
    }
    if !is_sha256_hex(&body.file_hash) {
        return Err(ApiError::BadRequest("fileHash must be a SHA-256 hex digest".into()));
    }
    let record = secured_record(body.file_name.trim(), &body.file_hash, body.signature.trim());
    info!(signature = %record.signature, hash = %record.file_hash, "evidence secured on devnet");
    Ok(Json(json!(record)))
}

// Landlord radar

fn required_address(q: &AddressQuery) -> Result<&str, ApiError> {
    q.address
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing address".into()))
}

async fn list_properties(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!(state.ledger.list_accounts().await))
}

async fn get_property(
    State(state): State<Arc<AppState>>,
    Query(q): Query<AddressQuery>,
) -> Result<Json<Value>, ApiError> {
    let address = required_address(&q)?;
    match state.ledger.fetch_account(address).await {
        Some(account) => Ok(Json(json!(account))),
        None => Err(ApiError::NotFound("Property not found".into())),
    }
}

async fn get_coordinates(
    State(state): State<Arc<AppState>>,
    Query(q): Query<AddressQuery>,
) -> Result<Json<Value>, ApiError> {
    let address = required_address(&q)?;
    Ok(Json(json!(state.ledger.coordinates(address).await)))
}

async fn verify_lease_route(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<TenancyCheck>, ApiError> {
    let mut form = Form::read(multipart).await?;
    let address = form
        .text("address")
        .map(str::to_string)
        .ok_or_else(|| ApiError::BadRequest("Missing address".into()))?;
    let upload = form
        .take_file("file")
        .ok_or_else(|| ApiError::BadRequest("No file provided".into()))?;

    let property_name = match state.ledger.fetch_account(&address).await {
        Some(account) => account.address_hash,
        None => address,
    };

    let text = if filename_matches(&property_name, &upload.file_name) {
        None
    } else {
        match extract_upload(&upload).await {
            Ok(text) => Some(text),
            Err(e) => {
                warn!(file = %upload.file_name, "lease text unavailable: {e}");
                None
            }
        }
    };

    let check = verify_lease(&property_name, &upload.file_name, text.as_deref());
    info!(property = %property_name, verified = check.verified, "tenancy check");
    Ok(Json(check))
}

async fn add_review(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ReviewBody>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let Json(body) = body?;
    let result = state
        .ledger
        .add_review(&body.address, body.rating, &body.comment, body.proof_of_tenancy)
        .await;
    Ok(match result {
        Ok(signature) => (
            StatusCode::OK,
            Json(json!({ "success": true, "signature": signature })),
        ),
        Err(e) => {
            let status = match e {
                ReviewRejected::TenancyNotVerified => StatusCode::FORBIDDEN,
                ReviewRejected::InvalidRating(_) | ReviewRejected::EmptyComment => {
                    StatusCode::BAD_REQUEST
                }
            };
            (status, Json(json!({ "success": false, "error": e.to_string() })))
        }
    })
}

// SSE logs: ring buffer history first, then live events

pub(crate) async fn sse_logs(
    State(state): State<Arc<AppState>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<String>();
    // Subscribe before snapshotting the ring so nothing falls in between.
    let live_rx = state.log_tx.subscribe();
    let history: Vec<String> = state
        .log_ring
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .iter()
        .cloned()
        .collect();
    tokio::spawn(async move {
        for line in history {
            if tx.send(line).is_err() {
                return;
            }
        }
        let mut live_rx = live_rx;
        loop {
            match live_rx.recv().await {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        return;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }
    });
    let stream = UnboundedReceiverStream::new(rx)
        .map(|data| Ok::<_, Infallible>(Event::default().data(data)));
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(std::time::Duration::from_secs(15))
            .text("ping"),
    )
}
