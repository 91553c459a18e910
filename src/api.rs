use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use bytes::Bytes;
use http::StatusCode;
use serde_json::Value;
use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::{
    config::AppConfig,
    error::ApiError,
    languages::adapter_for,
    metrics::MetricsRegistry,
    models::{ExecutionRequest, Language, RunOutcome},
    workspace::Workspace,
};

#[derive(Clone)]
pub struct AppState {
    config: Arc<AppConfig>,
    metrics: Arc<MetricsRegistry>,
    permits: Arc<Semaphore>,
}

pub fn routes(config: Arc<AppConfig>, metrics: Arc<MetricsRegistry>) -> Router {
    let permits = Arc::new(Semaphore::new(config.max_concurrency));
    let state = AppState {
        config,
        metrics,
        permits,
    };
    Router::new()
        .route("/healthz", get(health))
        .route("/metrics", get(metrics_endpoint))
        .route("/api/run-code", post(run_code))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "ok": true }))
}

async fn metrics_endpoint(State(state): State<AppState>) -> (StatusCode, String) {
    (StatusCode::OK, state.metrics.render_prometheus())
}

/// The one execution endpoint. Malformed requests are the only 4xx
/// source; compile errors, runtime errors, and timeouts all come back as
/// HTTP 200 with the failure envelope, so callers always get a JSON body.
async fn run_code(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<RunOutcome>, ApiError> {
    let request = parse_request(&body).inspect_err(|_| state.metrics.rejected())?;

    let request_id = Uuid::new_v4();
    tracing::info!(
        request_id = %request_id,
        language = %request.language,
        code_bytes = request.code.len(),
        "execution accepted"
    );

    let _permit = state
        .permits
        .acquire()
        .await
        .map_err(|_| ApiError::Internal("service shutting down".to_string()))?;
    state.metrics.started();

    let started = std::time::Instant::now();
    let workspace = Workspace::allocate(&state.config.runner.workspace_root)
        .await
        .inspect_err(|_| state.metrics.failed())?;

    let adapter = adapter_for(request.language);
    let outcome = adapter
        .execute(
            &workspace,
            &request.code,
            request.input.as_ref(),
            &state.config.runner,
        )
        .await;
    workspace.release().await;

    if outcome.timed_out() {
        state.metrics.timed_out();
    } else if outcome.is_success() {
        state.metrics.succeeded();
    } else {
        state.metrics.failed();
    }
    tracing::info!(
        request_id = %request_id,
        language = %request.language,
        success = outcome.is_success(),
        duration_ms = started.elapsed().as_millis() as u64,
        "execution finished"
    );

    Ok(Json(outcome))
}

/// Parses the raw body by hand so the rejection shapes stay exact:
/// unparseable JSON, a bad `language`, and a bad `code` each get their
/// own message, all as 400 with an `error` field.
fn parse_request(body: &[u8]) -> Result<ExecutionRequest, ApiError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|_| ApiError::InvalidRequest("Invalid JSON body".to_string()))?;

    let language_field = value
        .get("language")
        .ok_or_else(|| ApiError::InvalidRequest("language is required".to_string()))?;
    let language_raw = language_field.as_str().ok_or_else(|| {
        ApiError::InvalidRequest("language must be a string".to_string())
    })?;
    let language = Language::parse(language_raw).ok_or_else(|| {
        ApiError::InvalidRequest(format!("unsupported language: {language_raw}"))
    })?;

    let code_field = value
        .get("code")
        .ok_or_else(|| ApiError::InvalidRequest("code is required".to_string()))?;
    let code = code_field
        .as_str()
        .ok_or_else(|| ApiError::InvalidRequest("code must be a string".to_string()))?;
    if code.trim().is_empty() {
        return Err(ApiError::InvalidRequest("code is empty".to_string()));
    }

    let input = value.get("input").filter(|v| !v.is_null()).cloned();

    Ok(ExecutionRequest {
        language,
        code: code.to_string(),
        input,
    })
}
