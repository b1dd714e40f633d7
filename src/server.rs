//! HTTP control surface
//!
//! Thin JSON API over the engine: status snapshot, start/stop, liveness.
//! No state of its own - every handler reads or pokes the shared engine.
//!
//! Author: AI-Generated
//! Created: 2026-08-21

use crate::engine::Engine;
use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

pub fn create_router(engine: Arc<Engine>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/status", get(status))
        .route("/start", post(start))
        .route("/stop", post(stop))
        .route("/health", get(health))
        .layer(cors)
        .with_state(engine)
}

/// Bind and serve until the process exits
pub async fn serve(engine: Arc<Engine>, port: u16) -> Result<()> {
    let app = create_router(engine);
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("🌐 Control API listening on http://{}", addr);
    axum::serve(listener, app).await.context("HTTP server error")?;
    Ok(())
}

async fn status(State(engine): State<Arc<Engine>>) -> impl IntoResponse {
    Json(engine.snapshot())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartRequest {
    #[serde(default = "default_dry_run")]
    dry_run: bool,
}

impl Default for StartRequest {
    fn default() -> Self {
        // detection without submission unless explicitly asked for
        Self { dry_run: true }
    }
}

fn default_dry_run() -> bool {
    true
}

async fn start(
    State(engine): State<Arc<Engine>>,
    request: Option<Json<StartRequest>>,
) -> impl IntoResponse {
    let Json(request) = request.unwrap_or_default();
    if engine.start(request.dry_run) {
        let mode = if request.dry_run { "dry-run" } else { "live" };
        (StatusCode::OK, Json(json!({ "status": "started", "mode": mode })))
    } else {
        (
            StatusCode::CONFLICT,
            Json(json!({ "error": "engine already running" })),
        )
    }
}

async fn stop(State(engine): State<Arc<Engine>>) -> impl IntoResponse {
    engine.stop();
    Json(json!({ "status": "stopped" }))
}

/// Liveness plus a config echo; secrets never leave the process
async fn health(State(engine): State<Arc<Engine>>) -> impl IntoResponse {
    let config = engine.config();
    Json(json!({
        "status": "ok",
        "running": engine.is_running(),
        "venues": config.venues.iter().map(|v| v.name.clone()).collect::<Vec<_>>(),
        "scanIntervalMs": config.scan_interval_ms,
        "minProfitQuote": config.min_profit_quote,
        "maxSlippageBps": config.max_slippage_bps,
        "maxConcurrentExecutions": config.max_concurrent_executions,
        "autoExecute": config.auto_execute,
    }))
}
