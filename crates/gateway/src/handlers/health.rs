//! Health check handlers

use axum::{extract::State, Json};
use scholarrank_scraper::GateStatus;
use serde::Serialize;
use serde_json::{json, Value};
use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: &'static str,
    pub strategy: &'static str,
    pub source: String,
    pub rerank_available: bool,
    pub captcha: GateStatus,
}

/// Liveness check
pub async fn ping() -> Json<Value> {
    Json(json!({ "message": "pong" }))
}

/// Service summary. Reports `degraded` while a scrape waits on a CAPTCHA.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let captcha = state.gate.status();
    let status = match captcha {
        GateStatus::Open => "healthy",
        GateStatus::Blocked { .. } => "degraded",
    };

    Json(HealthResponse {
        status: status.to_string(),
        version: scholarrank_common::VERSION,
        strategy: state.pipeline.strategy_name(),
        source: state.source.name().to_string(),
        rerank_available: state.pipeline.has_reranker(),
        captcha,
    })
}
