//! CAPTCHA stall inspection and manual resume

use axum::{extract::State, Json};
use scholarrank_scraper::GateStatus;
use serde::Serialize;
use crate::AppState;

#[derive(Serialize)]
pub struct ResumeResponse {
    /// Whether a stalled scrape was released
    pub resumed: bool,
    pub status: GateStatus,
}

pub async fn status(State(state): State<AppState>) -> Json<GateStatus> {
    Json(state.gate.status())
}

/// Call after solving the challenge in a browser
pub async fn resume(State(state): State<AppState>) -> Json<ResumeResponse> {
    let resumed = state.gate.resume();
    if !resumed {
        tracing::debug!("Resume requested but no scrape was waiting");
    }
    Json(ResumeResponse {
        resumed,
        status: state.gate.status(),
    })
}
