//! Salescope HTTP API
//!
//! Axum-based HTTP server that exposes the Ask assistant, the canned
//! dashboard reports and session management to the render surface.
//!
//! Architecture: each endpoint has a thin axum handler that delegates to a
//! pure inner function. The inner functions are directly testable without
//! axum dispatch machinery.
//!
//! Endpoints:
//! - GET    /health         — health check with store status
//! - GET    /version        — server version info
//! - POST   /ask            — run one natural-language question
//! - GET    /session/{key}  — ordered conversation turns
//! - DELETE /session/{key}  — whole-session clear
//! - POST   /cache/refresh  — drop every cached report ("Refresh Data")
//! - GET    /report/{name}  — canned cached report over a date range

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use salescope_core::models::Turn;
use salescope_core::{
    AskError, AssistantPipeline, CompletionConfig, GeminiCompletionClient, NlQueryTranslator,
    PgQueryExecutor, QueryExecutor, ResultCache, SalescopeConfig, SchemaContext,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::reports;
use crate::sessions::SessionStore;

/// Shared state for all HTTP handlers
pub struct AppState {
    pub pool: PgPool,
    pub config: SalescopeConfig,
    pub cache: ResultCache,
    pub sessions: SessionStore,
    pub executor: Arc<dyn QueryExecutor>,
    pub pipeline: Option<AssistantPipeline>,
}

impl AppState {
    /// Wire the state from config. A missing generation API key degrades
    /// the Ask endpoint to 503 instead of failing startup — only the
    /// analytical store is load-bearing for the rest of the surface.
    pub fn new(pool: PgPool, config: SalescopeConfig) -> Self {
        let executor: Arc<dyn QueryExecutor> = Arc::new(PgQueryExecutor::new(pool.clone()));

        let completion_config = CompletionConfig::new(
            config.generation.api_key.clone(),
            config.generation.model.clone(),
        );
        let pipeline = match GeminiCompletionClient::new(completion_config) {
            Ok(client) => Some(AssistantPipeline::new(
                NlQueryTranslator::new(Arc::new(client), SchemaContext::fct_orders()),
                executor.clone(),
            )),
            Err(e) => {
                tracing::warn!(error = %e, "Ask assistant disabled: no generation backend");
                None
            }
        };

        Self::with_parts(pool, config, executor, pipeline)
    }

    /// Assemble state from pre-built parts (integration tests swap in stub
    /// executors and mock generation backends here).
    pub fn with_parts(
        pool: PgPool,
        config: SalescopeConfig,
        executor: Arc<dyn QueryExecutor>,
        pipeline: Option<AssistantPipeline>,
    ) -> Self {
        Self {
            pool,
            config,
            cache: ResultCache::new(),
            sessions: SessionStore::new(),
            executor,
            pipeline,
        }
    }

    fn report_ttl(&self) -> Duration {
        Duration::from_secs(self.config.cache.report_ttl_seconds)
    }
}

/// Build the Axum router with all endpoints
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        .route("/ask", post(ask_handler))
        .route("/session/:key", get(turns_handler).delete(clear_handler))
        .route("/cache/refresh", post(refresh_handler))
        .route("/report/:name", get(report_handler))
        .with_state(state)
}

/// Start the HTTP server on the configured address.
/// Gracefully shuts down when the broadcast shutdown signal fires.
pub async fn start_http_server(
    state: Arc<AppState>,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let addr = format!("{}:{}", state.config.http.host, state.config.http.port);

    let app = build_router(state);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Salescope HTTP API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTP server shutting down...");
        })
        .await?;

    Ok(())
}

// ============================================================================
// Request / Response DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub session: String,
    pub question: String,
}

#[derive(Debug, Deserialize)]
pub struct ReportRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TurnsResponse {
    pub session: String,
    pub turns: Vec<Turn>,
    pub count: usize,
}

/// Standard HTTP error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub status: String,
}

impl ErrorResponse {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            error: msg.into(),
            status: "error".to_string(),
        }
    }
}

// ============================================================================
// Inner (directly testable) business logic functions
// ============================================================================

/// Inner health check — pings the store and returns (status_code, json_body).
pub async fn health_inner(pool: &PgPool) -> (StatusCode, serde_json::Value) {
    let pg_ver = match salescope_core::db::health_check(pool).await {
        Ok(v) => v,
        Err(e) => {
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                serde_json::json!({
                    "status": "unhealthy",
                    "error": e.to_string(),
                }),
            );
        }
    };

    (
        StatusCode::OK,
        serde_json::json!({
            "status": "healthy",
            "version": env!("CARGO_PKG_VERSION"),
            "postgresql": pg_ver,
        }),
    )
}

/// Inner version — version info (pure, no IO).
pub fn version_inner() -> serde_json::Value {
    serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "protocol": "salescope/1",
    })
}

/// Inner ask — runs one question through the pipeline under the session
/// lock. Per-turn failures come back as 200 with a FAILED turn; only
/// caller mistakes and a missing generation backend are HTTP errors.
pub async fn ask_inner(state: &AppState, req: AskRequest) -> (StatusCode, serde_json::Value) {
    let pipeline = match &state.pipeline {
        Some(p) => p,
        None => {
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                serde_json::json!(ErrorResponse::new(
                    "Ask assistant is not configured (no generation API key)"
                )),
            );
        }
    };

    if req.session.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            serde_json::json!(ErrorResponse::new("Session key must not be empty")),
        );
    }

    let session = state.sessions.get_or_create(&req.session);
    // Held across the whole pipeline run: one in-flight question per session
    let mut guard = session.lock().await;

    match pipeline.ask(&mut guard, &req.question).await {
        Ok(turn) => (
            StatusCode::OK,
            serde_json::json!({
                "status": "ok",
                "session": req.session,
                "turn": turn,
            }),
        ),
        Err(AskError::EmptyQuestion) => (
            StatusCode::BAD_REQUEST,
            serde_json::json!(ErrorResponse::new("Question must not be empty")),
        ),
    }
}

/// Inner turns — the ordered conversation log; an unknown key is an empty
/// session, not an error.
pub async fn turns_inner(state: &AppState, key: &str) -> TurnsResponse {
    let turns = match state.sessions.get(key) {
        Some(session) => session.lock().await.turns().to_vec(),
        None => Vec::new(),
    };
    let count = turns.len();

    TurnsResponse {
        session: key.to_string(),
        turns,
        count,
    }
}

/// Inner clear — atomic whole-session clear.
pub fn clear_inner(state: &AppState, key: &str) -> serde_json::Value {
    let cleared = state.sessions.remove(key);
    serde_json::json!({
        "status": "ok",
        "session": key,
        "cleared": cleared,
    })
}

/// Inner cache refresh — point-in-time removal of every cached report.
pub fn refresh_inner(state: &AppState) -> serde_json::Value {
    state.cache.clear_all();
    tracing::info!("Report cache cleared by user action");
    serde_json::json!({
        "status": "ok",
        "cleared": true,
    })
}

/// Inner report — canned cached report over a validated date range. A
/// failing report is a non-fatal inline error (502); the page keeps
/// rendering its other sections.
pub async fn report_inner(
    state: &AppState,
    name: &str,
    range: ReportRange,
) -> (StatusCode, serde_json::Value) {
    let report = match reports::find(name) {
        Some(r) => r,
        None => {
            return (
                StatusCode::BAD_REQUEST,
                serde_json::json!(ErrorResponse::new(format!("Unknown report: {}", name))),
            );
        }
    };

    if range.start > range.end {
        return (
            StatusCode::BAD_REQUEST,
            serde_json::json!(ErrorResponse::new(
                "Start date must be on or before end date"
            )),
        );
    }

    match reports::run_report(
        report,
        range.start,
        range.end,
        state.report_ttl(),
        &state.cache,
        state.executor.as_ref(),
    )
    .await
    {
        Ok(result) => (
            StatusCode::OK,
            serde_json::json!({
                "status": "ok",
                "report": name,
                "result": result,
            }),
        ),
        Err(e) => {
            tracing::error!(report = name, error = %e, "Report query failed");
            (
                StatusCode::BAD_GATEWAY,
                serde_json::json!(ErrorResponse::new(format!("Report failed: {}", e))),
            )
        }
    }
}

// ============================================================================
// Thin axum handlers
// ============================================================================

async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (status, body) = health_inner(&state.pool).await;
    (status, Json(body))
}

async fn version_handler() -> impl IntoResponse {
    Json(version_inner())
}

async fn ask_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AskRequest>,
) -> impl IntoResponse {
    let (status, body) = ask_inner(&state, req).await;
    (status, Json(body))
}

async fn turns_handler(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> impl IntoResponse {
    Json(turns_inner(&state, &key).await)
}

async fn clear_handler(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> impl IntoResponse {
    Json(clear_inner(&state, &key))
}

async fn refresh_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(refresh_inner(&state))
}

async fn report_handler(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Query(range): Query<ReportRange>,
) -> impl IntoResponse {
    let (status, body) = report_inner(&state, &name, range).await;
    (status, Json(body))
}
