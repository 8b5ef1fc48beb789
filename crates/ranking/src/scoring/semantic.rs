//! Embedding-based scoring
//!
//! Similarity is the cosine between query and candidate embeddings, filled in
//! by the pipeline before scoring. The combination is fixed and ignores
//! per-call weights.

use super::{ScoringStrategy, ScoringWeights, SimilaritySource, CITATION_NORMALIZER};
use crate::features::FeatureVector;

pub const SEMANTIC_SIMILARITY_WEIGHT: f64 = 0.4;
pub const SEMANTIC_CITATION_WEIGHT: f64 = 0.25;
pub const SEMANTIC_RECENCY_WEIGHT: f64 = 0.25;

/// Added when a direct PDF link is available
pub const PDF_BONUS: f64 = 0.1;

#[derive(Debug, Clone, Copy, Default)]
pub struct SemanticScorer;

impl ScoringStrategy for SemanticScorer {
    fn name(&self) -> &'static str {
        "semantic"
    }

    fn similarity_source(&self) -> SimilaritySource {
        SimilaritySource::Embedding
    }

    fn score(&self, features: &FeatureVector, _weights: &ScoringWeights) -> f64 {
        let bonus = if features.has_pdf { PDF_BONUS } else { 0.0 };

        SEMANTIC_SIMILARITY_WEIGHT * features.similarity
            + SEMANTIC_CITATION_WEIGHT * (features.citations_per_year.ln_1p() / CITATION_NORMALIZER)
            + SEMANTIC_RECENCY_WEIGHT * features.recency_decay
            + bonus
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::Mode;

    #[test]
    fn test_fixed_combination() {
        let features = FeatureVector {
            similarity: 1.0,
            citations_per_year: 0.0,
            recency_decay: 1.0,
            ..FeatureVector::default()
        };
        let score = SemanticScorer.score(&features, &Mode::Balanced.weights());
        assert!((score - 0.65).abs() < 1e-12);

        // Weights passed in do not matter
        assert_eq!(score, SemanticScorer.score(&features, &Mode::Famous.weights()));
    }

    #[test]
    fn test_pdf_bonus() {
        let without = FeatureVector::default();
        let with = FeatureVector {
            has_pdf: true,
            ..FeatureVector::default()
        };
        let weights = ScoringWeights::default();
        assert_eq!(SemanticScorer.score(&without, &weights), 0.0);
        assert!((SemanticScorer.score(&with, &weights) - PDF_BONUS).abs() < 1e-12);
    }
}
