//! Weighted-sum scoring

use super::{ScoringStrategy, ScoringWeights, CITATION_NORMALIZER};
use crate::features::FeatureVector;
use scholarrank_common::AppError;
use std::str::FromStr;

/// How citations enter the score
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CitationPolicy {
    /// `ln(1 + citations)`
    #[default]
    Log,
    /// `ln(1 + citations per year)`
    PerYear,
}

/// How publication year enters the score
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RecencyPolicy {
    /// `max(0, (year - 2000) / 25)`
    #[default]
    Linear,
    /// `exp(-age / tau)`
    Decay,
}

impl FromStr for CitationPolicy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "log" => Ok(CitationPolicy::Log),
            "per_year" => Ok(CitationPolicy::PerYear),
            other => Err(AppError::Configuration {
                message: format!("Unknown citation policy: {}", other),
            }),
        }
    }
}

impl FromStr for RecencyPolicy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "linear" => Ok(RecencyPolicy::Linear),
            "decay" => Ok(RecencyPolicy::Decay),
            other => Err(AppError::Configuration {
                message: format!("Unknown recency policy: {}", other),
            }),
        }
    }
}

/// `w_sim * similarity + w_cit * citation / 10 + w_rec * recency`
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicScorer {
    citation: CitationPolicy,
    recency: RecencyPolicy,
}

impl HeuristicScorer {
    pub fn new(citation: CitationPolicy, recency: RecencyPolicy) -> Self {
        Self { citation, recency }
    }

    fn citation_term(&self, features: &FeatureVector) -> f64 {
        match self.citation {
            CitationPolicy::Log => features.citation_impact,
            CitationPolicy::PerYear => features.citations_per_year.ln_1p(),
        }
    }

    fn recency_term(&self, features: &FeatureVector) -> f64 {
        match self.recency {
            RecencyPolicy::Linear => features.recency_linear,
            RecencyPolicy::Decay => features.recency_decay,
        }
    }
}

impl ScoringStrategy for HeuristicScorer {
    fn name(&self) -> &'static str {
        "heuristic"
    }

    fn score(&self, features: &FeatureVector, weights: &ScoringWeights) -> f64 {
        weights.similarity * features.similarity
            + weights.citation * (self.citation_term(features) / CITATION_NORMALIZER)
            + weights.recency * self.recency_term(features)
    }
}
