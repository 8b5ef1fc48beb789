//! Bayesian linear-regression scoring
//!
//! Weights over `[similarity, citation_impact / 10, recency_linear]` get a
//! Normal prior `N([0.8, 0.5, 0.5], 0.3^2 I)` and the noise a half-normal
//! prior. The model is fit against a constant target of 1.0 for every record,
//! since there are no relevance labels. The posterior therefore stays close
//! to the prior: treat this strategy as prior-weighted scoring expressed
//! probabilistically, not as a trained model.
//!
//! The posterior mean is computed in closed form (conjugate Normal update)
//! with the noise fixed at the half-normal prior's mean.

use super::{ScoringStrategy, ScoringWeights, CITATION_NORMALIZER};
use crate::features::FeatureVector;
use std::f64::consts::PI;

pub const PRIOR_MEANS: [f64; 3] = [0.8, 0.5, 0.5];
pub const PRIOR_SCALE: f64 = 0.3;
pub const NOISE_PRIOR_SCALE: f64 = 1.0;

type Mat3 = [[f64; 3]; 3];

#[derive(Debug, Clone, Copy)]
pub struct BayesianScorer {
    prior_means: [f64; 3],
    prior_scale: f64,
    noise_scale: f64,
}

impl Default for BayesianScorer {
    fn default() -> Self {
        Self {
            prior_means: PRIOR_MEANS,
            prior_scale: PRIOR_SCALE,
            noise_scale: NOISE_PRIOR_SCALE,
        }
    }
}

impl BayesianScorer {
    /// Point estimate of the noise standard deviation: mean of HalfNormal(scale)
    pub fn noise_sigma(&self) -> f64 {
        self.noise_scale * (2.0 / PI).sqrt()
    }

    fn design_row(features: &FeatureVector) -> [f64; 3] {
        [
            features.similarity,
            features.citation_impact / CITATION_NORMALIZER,
            features.recency_linear,
        ]
    }

    /// Posterior mean of the weights given the pool, with a unit target
    pub fn posterior_mean(&self, pool: &[FeatureVector]) -> [f64; 3] {
        if pool.is_empty() {
            return self.prior_means;
        }

        let prior_precision = 1.0 / (self.prior_scale * self.prior_scale);
        let noise_precision = 1.0 / self.noise_sigma().powi(2);

        let mut precision: Mat3 = [[0.0; 3]; 3];
        let mut rhs = [0.0; 3];
        for i in 0..3 {
            precision[i][i] = prior_precision;
            rhs[i] = prior_precision * self.prior_means[i];
        }

        for features in pool {
            let x = Self::design_row(features);
            for i in 0..3 {
                for j in 0..3 {
                    precision[i][j] += noise_precision * x[i] * x[j];
                }
                // target is 1.0
                rhs[i] += noise_precision * x[i];
            }
        }

        match invert(&precision) {
            Some(covariance) => {
                let mut mean = [0.0; 3];
                for i in 0..3 {
                    mean[i] = (0..3).map(|j| covariance[i][j] * rhs[j]).sum();
                }
                mean
            }
            None => {
                tracing::warn!("Singular posterior precision, using prior means");
                self.prior_means
            }
        }
    }

    fn apply(weights: &[f64; 3], features: &FeatureVector) -> f64 {
        let x = Self::design_row(features);
        (0..3).map(|i| weights[i] * x[i]).sum()
    }
}

impl ScoringStrategy for BayesianScorer {
    fn name(&self) -> &'static str {
        "bayesian"
    }

    /// Without a pool to fit, the posterior is the prior
    fn score(&self, features: &FeatureVector, _weights: &ScoringWeights) -> f64 {
        Self::apply(&self.prior_means, features)
    }

    fn score_pool(&self, features: &[FeatureVector], _weights: &ScoringWeights) -> Vec<f64> {
        let posterior = self.posterior_mean(features);
        tracing::debug!(
            similarity = posterior[0],
            citation = posterior[1],
            recency = posterior[2],
            pool_size = features.len(),
            "Posterior mean weights"
        );
        features.iter().map(|f| Self::apply(&posterior, f)).collect()
    }
}

fn invert(m: &Mat3) -> Option<Mat3> {
    let cofactor = |r0: usize, r1: usize, c0: usize, c1: usize| m[r0][c0] * m[r1][c1] - m[r0][c1] * m[r1][c0];

    let c00 = cofactor(1, 2, 1, 2);
    let c01 = -cofactor(1, 2, 0, 2);
    let c02 = cofactor(1, 2, 0, 1);
    let det = m[0][0] * c00 + m[0][1] * c01 + m[0][2] * c02;
    if !det.is_finite() || det.abs() < 1e-12 {
        return None;
    }

    let c10 = -cofactor(0, 2, 1, 2);
    let c11 = cofactor(0, 2, 0, 2);
    let c12 = -cofactor(0, 2, 0, 1);
    let c20 = cofactor(0, 1, 1, 2);
    let c21 = -cofactor(0, 1, 0, 2);
    let c22 = cofactor(0, 1, 0, 1);

    // inverse = adjugate / det, adjugate = transpose of the cofactor matrix
    Some([
        [c00 / det, c10 / det, c20 / det],
        [c01 / det, c11 / det, c21 / det],
        [c02 / det, c12 / det, c22 / det],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_empty_pool_keeps_prior() {
        let scorer = BayesianScorer::default();
        assert_eq!(scorer.posterior_mean(&[]), PRIOR_MEANS);
    }

    #[test]
    fn test_uninformative_record_stays_near_prior() {
        let scorer = BayesianScorer::default();
        let posterior = scorer.posterior_mean(&[FeatureVector::default()]);
        for (got, prior) in posterior.iter().zip(PRIOR_MEANS) {
            assert!((got - prior).abs() < 1e-9, "{got} vs {prior}");
        }
    }

    #[test]
    fn test_single_record_update() {
        let scorer = BayesianScorer::default();
        let features = FeatureVector {
            similarity: 1.0,
            ..FeatureVector::default()
        };
        let mean = scorer.posterior_mean(&[features]);

        let prior_precision = 1.0 / 0.09;
        let noise_precision = 1.0 / scorer.noise_sigma().powi(2);
        let expected = (prior_precision * 0.8 + noise_precision) / (prior_precision + noise_precision);
        assert!(close(mean[0], expected));
        assert!(close(mean[1], 0.5));
        assert!(close(mean[2], 0.5));
        // Pulled from the prior towards the unit target
        assert!(mean[0] > 0.8 && mean[0] < 1.0);
    }

    #[test]
    fn test_prior_dominates_small_pools() {
        let scorer = BayesianScorer::default();
        let pool: Vec<FeatureVector> = (0..5)
            .map(|i| FeatureVector {
                similarity: 0.2 * i as f64,
                citation_impact: i as f64,
                recency_linear: 0.5,
                ..FeatureVector::default()
            })
            .collect();
        let mean = scorer.posterior_mean(&pool);
        for (m, p) in mean.iter().zip(PRIOR_MEANS) {
            assert!((m - p).abs() < 0.5);
        }
    }

    #[test]
    fn test_score_pool_is_deterministic() {
        let scorer = BayesianScorer::default();
        let pool = vec![
            FeatureVector { similarity: 0.9, recency_linear: 0.8, ..FeatureVector::default() },
            FeatureVector { similarity: 0.1, citation_impact: 6.0, ..FeatureVector::default() },
        ];
        let weights = ScoringWeights::default();
        let first = scorer.score_pool(&pool, &weights);
        assert_eq!(first, scorer.score_pool(&pool, &weights));
        assert_eq!(first.len(), 2);
        assert!(first.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn test_invert_identity() {
        let identity: Mat3 = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        assert_eq!(invert(&identity), Some(identity));

        let m: Mat3 = [[4.0, 1.0, 0.0], [1.0, 3.0, 1.0], [0.0, 1.0, 2.0]];
        let inv = invert(&m).unwrap();
        for i in 0..3 {
            for j in 0..3 {
                let v: f64 = (0..3).map(|k| m[i][k] * inv[k][j]).sum();
                assert!(close(v, if i == j { 1.0 } else { 0.0 }));
            }
        }

        assert!(invert(&[[1.0, 2.0, 3.0], [2.0, 4.0, 6.0], [0.0, 0.0, 1.0]]).is_none());
    }
}
