//! # REST API
//!
//! Builds the axum router that fronts the gateway client. All endpoints
//! share application state through axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path            | Description                               |
//! |--------|-----------------|-------------------------------------------|
//! | GET    | `/health`       | Liveness probe                            |
//! | GET    | `/status`       | Service + peer configuration summary      |
//! | GET    | `/metrics`      | Prometheus metrics                        |
//! | POST   | `/api/invoke`   | Submit a state-changing transaction       |
//! | POST   | `/api/evaluate` | Run a read-only chaincode query           |
//!
//! Error responses carry the gateway error taxonomy: the `kind` field is
//! the stable label (`transport`, `network`, `commit_timeout`, ...), and
//! the HTTP status maps from it. A commit timeout maps to 504 and its
//! body says "outcome unknown" — the one case a caller must NOT blindly
//! retry.

use axum::extract::State;
use axum::http::{Method, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use conduit_gateway::error::{ErrorKind, GatewayError};
use conduit_gateway::GatewayClient;

use crate::metrics::{metrics_handler, SharedMetrics};

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone — everything behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The service's reported version string.
    pub version: String,
    /// The gateway client all transaction traffic flows through.
    pub client: Arc<GatewayClient>,
    /// Prometheus metric handles.
    pub metrics: SharedMetrics,
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all routes, CORS, and tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/metrics", get(metrics_handler))
        .route("/api/invoke", post(invoke_handler))
        .route("/api/evaluate", post(evaluate_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / Response Types
// ---------------------------------------------------------------------------

/// Body of an invoke or evaluate request.
#[derive(Debug, Deserialize)]
pub struct TransactionRequest {
    /// Chaincode to call; defaults to the configured chaincode.
    pub chaincode_name: Option<String>,
    /// Chaincode function name. Required.
    #[serde(default)]
    pub function: String,
    /// Positional string arguments.
    #[serde(default)]
    pub args: Vec<String>,
}

/// Response envelope for both transaction endpoints.
///
/// Exactly one of `result`/`error` is present; the commit metadata fields
/// appear only for invokes.
#[derive(Debug, Serialize, Deserialize)]
pub struct TransactionResponse {
    /// "success" or "error".
    pub status: String,
    /// Chaincode payload, UTF-8 decoded, on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    /// Error message on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Stable error-kind label on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Transaction ID (invoke only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_id: Option<String>,
    /// Block the transaction committed in (invoke only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    /// Validation code assigned at commit (invoke only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_code: Option<u32>,
    /// Whether the transaction validated (invoke only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
}

impl TransactionResponse {
    fn error(message: String, kind: ErrorKind) -> Self {
        Self {
            status: "error".into(),
            result: None,
            error: Some(message),
            kind: Some(kind.as_str().into()),
            tx_id: None,
            block_number: None,
            result_code: None,
            success: None,
        }
    }

    fn bad_request(message: &str) -> (StatusCode, Json<Self>) {
        (
            StatusCode::BAD_REQUEST,
            Json(Self {
                status: "error".into(),
                result: None,
                error: Some(message.into()),
                kind: None,
                tx_id: None,
                block_number: None,
                result_code: None,
                success: None,
            }),
        )
    }
}

/// HTTP status for each gateway error kind.
fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        // Upstream (peer/network) trouble.
        ErrorKind::Transport | ErrorKind::Network => StatusCode::BAD_GATEWAY,
        // Outcome unknown: the wait expired, not the transaction.
        ErrorKind::CommitTimeout => StatusCode::GATEWAY_TIMEOUT,
        // Our side is misconfigured.
        ErrorKind::Config | ErrorKind::Parse | ErrorKind::Identity => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn error_response(state: &AppState, err: GatewayError) -> (StatusCode, Json<TransactionResponse>) {
    let kind = err.kind();
    state
        .metrics
        .failures_total
        .with_label_values(&[kind.as_str()])
        .inc();
    (
        status_for(kind),
        Json(TransactionResponse::error(err.to_string(), kind)),
    )
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Service summary for operators: what this gateway talks to and how the
/// peer fleet is doing.
async fn status_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let quarantined = (0..state.client.peer_count())
        .filter(|&i| state.client.peer_health().is_quarantined(i))
        .count();
    Json(serde_json::json!({
        "version": state.version,
        "channel": state.client.channel_name(),
        "chaincode": state.client.chaincode_name(),
        "peers": state.client.peer_count(),
        "peers_quarantined": quarantined,
    }))
}

async fn invoke_handler(
    State(state): State<AppState>,
    Json(request): Json<TransactionRequest>,
) -> (StatusCode, Json<TransactionResponse>) {
    if request.function.trim().is_empty() {
        return TransactionResponse::bad_request("function is required");
    }
    let chaincode = request
        .chaincode_name
        .as_deref()
        .unwrap_or_else(|| state.client.chaincode_name())
        .to_string();

    state.metrics.invokes_total.inc();
    let timer = state.metrics.call_latency_seconds.start_timer();
    let outcome = state
        .client
        .invoke(&chaincode, &request.function, &request.args)
        .await;
    timer.observe_duration();

    match outcome {
        Ok(result) => (
            StatusCode::OK,
            Json(TransactionResponse {
                status: "success".into(),
                result: Some(String::from_utf8_lossy(&result.payload).into_owned()),
                error: None,
                kind: None,
                tx_id: Some(result.tx_id),
                block_number: Some(result.block_number),
                result_code: Some(result.result_code),
                success: Some(result.success),
            }),
        ),
        Err(err) => error_response(&state, err),
    }
}

async fn evaluate_handler(
    State(state): State<AppState>,
    Json(request): Json<TransactionRequest>,
) -> (StatusCode, Json<TransactionResponse>) {
    if request.function.trim().is_empty() {
        return TransactionResponse::bad_request("function is required");
    }
    let chaincode = request
        .chaincode_name
        .as_deref()
        .unwrap_or_else(|| state.client.chaincode_name())
        .to_string();

    state.metrics.evaluates_total.inc();
    let timer = state.metrics.call_latency_seconds.start_timer();
    let outcome = state
        .client
        .evaluate(&chaincode, &request.function, &request.args)
        .await;
    timer.observe_duration();

    match outcome {
        Ok(payload) => (
            StatusCode::OK,
            Json(TransactionResponse {
                status: "success".into(),
                result: Some(String::from_utf8_lossy(&payload).into_owned()),
                error: None,
                kind: None,
                tx_id: None,
                block_number: None,
                result_code: None,
                success: None,
            }),
        ),
        Err(err) => error_response(&state, err),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
