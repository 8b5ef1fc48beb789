//! Scoring engine
//!
//! One capability, three interchangeable policies behind [`ScoringStrategy`]:
//! - `heuristic`: weighted sum of similarity, citation impact and recency
//! - `semantic`: embedding similarity with fixed weights and a PDF bonus
//! - `bayesian`: posterior-mean weights under a Normal prior (see
//!   [`BayesianScorer`] for why this is prior-weighted scoring in practice)

mod bayesian;
mod heuristic;
mod semantic;
mod weights;

pub use bayesian::BayesianScorer;
pub use heuristic::{CitationPolicy, HeuristicScorer, RecencyPolicy};
pub use semantic::SemanticScorer;
pub use weights::{Mode, ScoringWeights, Weighting};

use crate::features::FeatureVector;
use scholarrank_common::config::ScoringConfig;
use scholarrank_common::{AppError, Result};
use std::sync::Arc;

/// Divisor keeping the log-scaled citation term commensurate with the
/// [0, 1] similarity and recency terms
pub const CITATION_NORMALIZER: f64 = 10.0;

/// Where a strategy expects its similarity feature to come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimilaritySource {
    /// Edit-style sequence ratio against the title or snippet
    Sequence,
    /// Cosine similarity of query and candidate embeddings
    Embedding,
}

/// A scoring policy
pub trait ScoringStrategy: Send + Sync {
    /// Strategy name, for logs and metrics
    fn name(&self) -> &'static str;

    fn similarity_source(&self) -> SimilaritySource {
        SimilaritySource::Sequence
    }

    /// Score one record's features
    fn score(&self, features: &FeatureVector, weights: &ScoringWeights) -> f64;

    /// Score a whole pool, in pool order
    fn score_pool(&self, features: &[FeatureVector], weights: &ScoringWeights) -> Vec<f64> {
        features.iter().map(|f| self.score(f, weights)).collect()
    }
}

/// Build the strategy named in configuration
pub fn create_strategy(config: &ScoringConfig) -> Result<Arc<dyn ScoringStrategy>> {
    let strategy: Arc<dyn ScoringStrategy> = match config.strategy.as_str() {
        "heuristic" => Arc::new(HeuristicScorer::new(
            config.citation_policy.parse()?,
            config.recency_policy.parse()?,
        )),
        "semantic" => Arc::new(SemanticScorer),
        "bayesian" => Arc::new(BayesianScorer::default()),
        other => {
            return Err(AppError::Configuration {
                message: format!("Unknown scoring strategy: {}", other),
            })
        }
    };
    Ok(strategy)
}
