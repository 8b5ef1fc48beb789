//! Ranking: stable descending sort and truncation

use crate::features::FeatureVector;
use scholarrank_common::PaperRecord;
use serde::{Deserialize, Serialize};

/// A record with its score and the features that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPaper {
    pub paper: PaperRecord,
    pub score: f64,
    pub features: FeatureVector,
}

/// Sort by score descending and keep the first `max_results`.
///
/// Equal scores keep their input order. An empty input or `max_results == 0`
/// yields an empty ranking.
pub fn rank(mut scored: Vec<ScoredPaper>, max_results: usize) -> Vec<ScoredPaper> {
    // `sort_by` is stable; total_cmp keeps the order total even for NaN
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(max_results);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn scored(title: &str, score: f64) -> ScoredPaper {
        ScoredPaper {
            paper: PaperRecord::new(title),
            score,
            features: FeatureVector::default(),
        }
    }

    fn titles(ranked: &[ScoredPaper]) -> Vec<&str> {
        ranked.iter().map(|s| s.paper.title.as_str()).collect()
    }

    #[test]
    fn test_descending_order() {
        let ranked = rank(vec![scored("a", 0.1), scored("b", 0.9), scored("c", 0.5)], 10);
        assert_eq!(titles(&ranked), vec!["b", "c", "a"]);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let ranked = rank(
            vec![scored("x", 0.3), scored("first", 0.7), scored("second", 0.7), scored("third", 0.7)],
            3,
        );
        assert_eq!(titles(&ranked), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_empty_and_zero() {
        assert!(rank(Vec::new(), 5).is_empty());
        assert!(rank(vec![scored("a", 1.0)], 0).is_empty());
    }

    #[test]
    fn test_random_pools_truncate_and_stay_stable() {
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..200 {
            let len = rng.gen_range(0..40);
            // few distinct scores so ties are common
            let pool: Vec<ScoredPaper> = (0..len)
                .map(|i| scored(&i.to_string(), rng.gen_range(0..4) as f64 / 4.0))
                .collect();
            let k = rng.gen_range(0..50);

            let ranked = rank(pool.clone(), k);
            assert_eq!(ranked.len(), k.min(pool.len()));

            for pair in ranked.windows(2) {
                assert!(pair[0].score >= pair[1].score);
                if pair[0].score == pair[1].score {
                    let a: usize = pair[0].paper.title.parse().unwrap();
                    let b: usize = pair[1].paper.title.parse().unwrap();
                    assert!(a < b);
                }
            }
        }
    }
}
