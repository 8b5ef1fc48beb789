//! Full selection: weighted shortlist, optional LLM rerank and summary

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use validator::Validate;

use super::{views, within_deadline, PaperView, NO_RESULTS_MESSAGE};
use crate::AppState;
use scholarrank_common::{
    errors::{AppError, Result},
    llm::SummaryStyle,
    SortOrder,
};
use scholarrank_ranking::{Mode, RerankOutcome, ScoringWeights, SelectionRequest, Weighting};

/// Body of `POST /v1/select`. Unset limits fall back to configuration.
#[derive(Debug, Deserialize, Validate)]
pub struct SelectBody {
    #[validate(length(min = 1, max = 500))]
    pub query: String,

    /// Named preset; exclusive with `weights`
    pub mode: Option<Mode>,

    /// Custom weight triple; exclusive with `mode`
    pub weights: Option<ScoringWeights>,

    #[validate(range(min = 1, max = 200))]
    pub pool_size: Option<usize>,

    #[validate(range(min = 1, max = 100))]
    pub filter_top_k: Option<usize>,

    #[validate(range(min = 1, max = 50))]
    pub final_count: Option<usize>,

    pub rerank: Option<bool>,

    #[serde(default)]
    pub summarize: bool,

    #[serde(default)]
    pub style: SummaryStyle,

    #[serde(default)]
    pub sort_by: SortOrder,
}

impl SelectBody {
    fn weighting(&self, default: Weighting) -> Result<Weighting> {
        match (self.mode, self.weights) {
            (Some(_), Some(_)) => Err(AppError::validation("weights", "give either mode or weights, not both")),
            (Some(mode), None) => Ok(Weighting::Mode(mode)),
            (None, Some(weights)) => {
                weights.validate()?;
                Ok(Weighting::Custom(weights))
            }
            (None, None) => Ok(default),
        }
    }

    fn to_request(&self, defaults: SelectionRequest) -> Result<SelectionRequest> {
        Ok(SelectionRequest {
            pool_size: self.pool_size.unwrap_or(defaults.pool_size),
            filter_top_k: self.filter_top_k.unwrap_or(defaults.filter_top_k),
            final_count: self.final_count.unwrap_or(defaults.final_count),
            weighting: self.weighting(defaults.weighting)?,
            rerank: self.rerank.unwrap_or(defaults.rerank),
            sort: self.sort_by,
        })
    }
}

#[derive(Serialize)]
pub struct SelectResponse {
    pub query: String,
    pub weighting: &'static str,
    pub strategy: &'static str,
    pub pool_size: usize,
    pub shortlist_size: usize,
    pub rerank: RerankOutcome,
    pub results: Vec<PaperView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub processing_time_ms: u64,
}

pub async fn select(
    State(state): State<AppState>,
    Json(body): Json<SelectBody>,
) -> Result<Json<SelectResponse>> {
    let start = Instant::now();

    body.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let query = body.query.trim();
    if query.is_empty() {
        return Err(AppError::validation("query", "must not be blank"));
    }

    let defaults = SelectionRequest::from_config(&state.config.selection)?;
    let request = body.to_request(defaults)?;

    let selection = within_deadline(
        &state,
        state.pipeline.select_papers(state.source.as_ref(), query, &request),
    )
    .await?;

    if selection.pool_size == 0 {
        return Ok(Json(SelectResponse {
            query: query.to_string(),
            weighting: request.weighting.label(),
            strategy: state.pipeline.strategy_name(),
            pool_size: 0,
            shortlist_size: 0,
            rerank: selection.rerank,
            results: Vec::new(),
            summary: None,
            message: Some(NO_RESULTS_MESSAGE.to_string()),
            processing_time_ms: start.elapsed().as_millis() as u64,
        }));
    }

    let summary = if body.summarize {
        Some(state.summarizer.summarize(query, &selection.records(), body.style).await)
    } else {
        None
    };

    Ok(Json(SelectResponse {
        query: query.to_string(),
        weighting: request.weighting.label(),
        strategy: state.pipeline.strategy_name(),
        pool_size: selection.pool_size,
        shortlist_size: selection.shortlist_size,
        rerank: selection.rerank,
        results: views(&selection.papers),
        summary,
        message: None,
        processing_time_ms: start.elapsed().as_millis() as u64,
    }))
}
