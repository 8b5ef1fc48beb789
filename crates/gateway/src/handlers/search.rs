//! Quick search: fetch, score and rank without reranking

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use validator::Validate;

use super::{views, within_deadline, PaperView, NO_RESULTS_MESSAGE};
use crate::AppState;
use scholarrank_common::{
    errors::{AppError, Result},
    SortOrder,
};
use scholarrank_ranking::{Mode, SelectionRequest, Weighting};

/// Query string of `GET /v1/search`
#[derive(Debug, Deserialize, Validate)]
pub struct SearchParams {
    #[validate(length(min = 1, max = 500))]
    pub query: String,

    #[serde(default = "default_max_results")]
    #[validate(range(min = 1, max = 100))]
    pub max_results: usize,

    #[serde(default)]
    pub sort_by: SortOrder,

    #[serde(default)]
    pub mode: Mode,
}

fn default_max_results() -> usize { 10 }

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub mode: &'static str,
    pub sort_by: SortOrder,
    pub total_results: usize,
    pub results: Vec<PaperView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub processing_time_ms: u64,
}

/// Rank the first `max_results` records for `query`
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>> {
    let start = Instant::now();

    params.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let query = params.query.trim();
    if query.is_empty() {
        return Err(AppError::validation("query", "must not be blank"));
    }

    // The shortlist is the whole result here, so it obeys the same cap
    let max_shortlist = state.config.selection.max_filter_top_k;
    if params.max_results > max_shortlist {
        return Err(AppError::validation(
            "max_results",
            format!("must be at most {}", max_shortlist),
        ));
    }

    let request = SelectionRequest {
        pool_size: params.max_results,
        filter_top_k: params.max_results,
        final_count: params.max_results,
        weighting: Weighting::Mode(params.mode),
        rerank: false,
        sort: params.sort_by,
    };

    let selection = within_deadline(
        &state,
        state.pipeline.select_papers(state.source.as_ref(), query, &request),
    )
    .await?;

    let message = (selection.pool_size == 0).then(|| NO_RESULTS_MESSAGE.to_string());
    let results = views(&selection.papers);

    Ok(Json(SearchResponse {
        query: query.to_string(),
        mode: params.mode.as_str(),
        sort_by: params.sort_by,
        total_results: results.len(),
        results,
        message,
        processing_time_ms: start.elapsed().as_millis() as u64,
    }))
}
