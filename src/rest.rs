// Copyright 2026 Matchup Contributors
// SPDX-License-Identifier: Apache-2.0

//! HTTP REST API.
//!
//! Job submission, polling, export, a live event stream, and stored
//! artifacts. The job registry and the analyzer are owned by [`AppState`]
//! and handed to the router — no process globals.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::convert::Infallible;
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;
use uuid::Uuid;

use crate::analyzer::{parse_site_url, Analyzer};
use crate::config::AppConfig;
use crate::error::AnalysisError;
use crate::events::{self, AnalysisEvent, EventBus};
use crate::export::{self, ExportFormat};
use crate::job::{self, JobState, JobStore};

/// Shared state behind every handler.
pub struct AppState {
    pub store: Arc<JobStore>,
    pub analyzer: Arc<Analyzer>,
    pub events: EventBus,
    pub config: AppConfig,
    pub started_at: Instant,
}

/// Errors surfaced by the REST layer, mapped onto status codes.
#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("job not found: {0}")]
    NotFound(String),

    /// Export requested before the job reached `completed`.
    #[error("job is {0}; only completed jobs can be exported")]
    InvalidState(&'static str),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidState(_) | ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({ "success": false, "message": self.to_string() });
        (self.status(), Json(body)).into_response()
    }
}

impl From<AnalysisError> for ApiError {
    fn from(e: AnalysisError) -> Self {
        match e {
            AnalysisError::InvalidInput(msg) => ApiError::InvalidInput(msg),
            AnalysisError::SessionAcquisition(msg) => ApiError::Internal(msg),
        }
    }
}

/// Build the axum router with all endpoints.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/status", get(handle_status))
        .route("/api/analyze", post(handle_analyze))
        .route("/api/result/:job_id", get(handle_result))
        .route("/api/export/:job_id", get(handle_export))
        .route("/api/events", get(events_sse))
        .route("/screenshots/:name", get(serve_screenshot))
        .route("/exports/:name", get(serve_export))
        .layer(cors)
        .with_state(state)
}

/// Serve the REST API on the given port.
pub async fn start(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = router(state);
    let addr = std::net::SocketAddr::from(([127, 0, 0, 1], port));
    tracing::info!("REST API listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

// ── Handlers ────────────────────────────────────────────────────

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn handle_status(State(state): State<Arc<AppState>>) -> Json<Value> {
    let (processing, completed, failed) = state.store.counts();
    Json(json!({
        "running": true,
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_seconds": state.started_at.elapsed().as_secs_f64(),
        "jobs": {
            "processing": processing,
            "completed": completed,
            "failed": failed,
        },
        "active_sessions": state.analyzer.browser().active_sessions(),
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeRequest {
    url_a: Option<String>,
    url_b: Option<String>,
}

/// Submit an analysis job. Input is validated before a job is created, so a
/// malformed URL never occupies the registry.
async fn handle_analyze(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AnalyzeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let url_a = body
        .url_a
        .ok_or_else(|| ApiError::InvalidInput("urlA is required".into()))?;
    let url_b = body
        .url_b
        .ok_or_else(|| ApiError::InvalidInput("urlB is required".into()))?;
    parse_site_url(&url_a)?;
    parse_site_url(&url_b)?;

    let id = state.store.create(&url_a, &url_b);
    state.events.emit(AnalysisEvent::JobSubmitted {
        job_id: id.to_string(),
        url_a: url_a.clone(),
        url_b: url_b.clone(),
    });

    tokio::spawn(job::run(
        Arc::clone(&state.analyzer),
        Arc::clone(&state.store),
        state.events.clone(),
        id,
        url_a,
        url_b,
    ));

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "success": true,
            "message": "analysis started",
            "jobId": id.to_string(),
        })),
    ))
}

/// Poll a job. Unknown ids are 404; failed jobs surface their captured
/// message verbatim, never a stack trace.
async fn handle_result(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Result<Response, ApiError> {
    let job = lookup(&state, &job_id)?;

    let response = match &job.state {
        JobState::Processing => Json(json!({
            "success": true,
            "status": "processing",
        }))
        .into_response(),
        JobState::Failed(message) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "success": false,
                "status": "failed",
                "error": message,
            })),
        )
            .into_response(),
        JobState::Completed(result) => Json(json!({
            "success": true,
            "status": "completed",
            "data": result.as_ref(),
        }))
        .into_response(),
    };
    Ok(response)
}

#[derive(Deserialize, Default)]
struct ExportParams {
    format: Option<String>,
}

/// Export a completed job as CSV or an HTML report. The artifact is written
/// under the data directory and returned by reference.
async fn handle_export(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
    Query(params): Query<ExportParams>,
) -> Result<Json<Value>, ApiError> {
    let job = lookup(&state, &job_id)?;

    let result = match &job.state {
        JobState::Completed(result) => Arc::clone(result),
        other => return Err(ApiError::InvalidState(other.status())),
    };

    let format = match params.format.as_deref() {
        None => ExportFormat::Csv,
        Some(f) => ExportFormat::parse(f)
            .ok_or_else(|| ApiError::InvalidInput(format!("unknown export format '{f}'")))?,
    };

    let filename = export::artifact_filename(&job_id, format);
    let artifact = export::render(&result, format, chrono::Utc::now());
    let path = state.config.export_dir().join(&filename);
    tokio::fs::write(&path, &artifact)
        .await
        .map_err(|e| ApiError::Internal(format!("failed to write artifact: {e}")))?;

    Ok(Json(json!({
        "success": true,
        "format": format.extension(),
        "artifact": format!("/exports/{filename}"),
    })))
}

/// SSE query parameters.
#[derive(Deserialize, Default)]
struct EventsParams {
    job: Option<String>,
}

/// Server-Sent Events stream of analysis events, optionally filtered to one
/// job via `?job=<id>`.
async fn events_sse(
    Query(params): Query<EventsParams>,
    State(state): State<Arc<AppState>>,
) -> Sse<impl futures::Stream<Item = Result<Event, Infallible>>> {
    let mut rx = state.events.subscribe();
    let job_filter = params.job;

    let stream = async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if let Some(ref job_id) = job_filter {
                        if !events::event_matches_job(&event, job_id) {
                            continue;
                        }
                    }
                    if let Ok(json) = serde_json::to_string(&event) {
                        yield Ok(Event::default().data(json));
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {
                    // Slow consumer missed some events — keep streaming.
                    continue;
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                    break;
                }
            }
        }
    };

    Sse::new(stream).keep_alive(axum::response::sse::KeepAlive::default())
}

async fn serve_screenshot(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    serve_file(state.config.screenshot_dir(), &name, "image/png").await
}

async fn serve_export(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    let content_type = if name.ends_with(".html") {
        "text/html; charset=utf-8"
    } else {
        "text/csv; charset=utf-8"
    };
    serve_file(state.config.export_dir(), &name, content_type).await
}

// ── Helpers ─────────────────────────────────────────────────────

fn lookup(state: &AppState, job_id: &str) -> Result<crate::job::Job, ApiError> {
    // A malformed id cannot name a job; treat it as unknown.
    let id = Uuid::parse_str(job_id).map_err(|_| ApiError::NotFound(job_id.to_string()))?;
    state
        .store
        .snapshot(id)
        .ok_or_else(|| ApiError::NotFound(job_id.to_string()))
}

async fn serve_file(
    dir: std::path::PathBuf,
    name: &str,
    content_type: &'static str,
) -> Result<Response, ApiError> {
    // Artifact names are flat; anything path-like is rejected.
    if name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err(ApiError::NotFound(name.to_string()));
    }
    match tokio::fs::read(dir.join(name)).await {
        Ok(bytes) => Ok(([(header::CONTENT_TYPE, content_type)], bytes).into_response()),
        Err(e) => {
            warn!("artifact read failed for {name}: {e}");
            Err(ApiError::NotFound(name.to_string()))
        }
    }
}
