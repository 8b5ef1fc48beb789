//! API handlers

pub mod captcha;
pub mod health;
pub mod search;
pub mod select;

use crate::AppState;
use scholarrank_common::{AppError, Result};
use scholarrank_ranking::ScoredPaper;
use serde::Serialize;
use std::future::Future;

/// Shown instead of results when the source returned nothing
pub const NO_RESULTS_MESSAGE: &str = "no results retrievable";

/// One ranked paper as returned to API callers
#[derive(Debug, Serialize)]
pub struct PaperView {
    pub rank: usize,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scholar_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authors_year: Option<String>,
    pub citations: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    pub score: f64,
}

impl PaperView {
    pub fn from_scored(rank: usize, scored: &ScoredPaper) -> Self {
        let paper = &scored.paper;
        Self {
            rank,
            title: paper.title.clone(),
            link: paper.best_link().map(str::to_string),
            scholar_link: paper.stable_link.clone(),
            pdf_link: paper.pdf_link.clone(),
            snippet: paper.snippet.clone(),
            authors_year: paper.authors_year.clone(),
            citations: paper.citations_display(),
            year: paper.year,
            score: scored.score,
        }
    }
}

/// Number the papers from 1
pub fn views(papers: &[ScoredPaper]) -> Vec<PaperView> {
    papers
        .iter()
        .enumerate()
        .map(|(i, scored)| PaperView::from_scored(i + 1, scored))
        .collect()
}

/// Bound a handler's pipeline work by the configured request timeout
pub async fn within_deadline<T>(state: &AppState, work: impl Future<Output = Result<T>>) -> Result<T> {
    let timeout = state.config.request_timeout();
    tokio::time::timeout(timeout, work)
        .await
        .map_err(|_| AppError::ServiceUnavailable {
            message: format!("request did not finish within {}s", timeout.as_secs()),
        })?
}
