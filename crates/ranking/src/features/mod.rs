//! Feature extraction
//!
//! Turns a query and a `PaperRecord` into the raw signals every scoring
//! strategy draws from:
//! - Similarity between the query and the title (or snippet)
//! - Citation impact, log-scaled and per publication year
//! - Recency, linear from 2000 and exponentially decayed
//!
//! Missing fields contribute exactly 0.0. Nothing here fails.

mod similarity;

pub use similarity::{cosine_similarity, sequence_ratio};

use scholarrank_common::config::ScoringConfig;
use scholarrank_common::models::current_year;
use scholarrank_common::PaperRecord;
use serde::{Deserialize, Serialize};

/// Year at which linear recency starts counting
pub const RECENCY_BASE_YEAR: i32 = 2000;

/// Years over which linear recency grows from 0 to 1
pub const RECENCY_SPAN_YEARS: f64 = 25.0;

/// Default time constant for exponential recency decay
pub const DEFAULT_DECAY_TAU: f64 = 5.0;

/// Signals derived from one record
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Query/candidate similarity in [0, 1]
    pub similarity: f64,

    /// `ln(1 + citations)`, 0.0 when unknown
    pub citation_impact: f64,

    /// Citations divided by the paper's age in years (at least 1)
    pub citations_per_year: f64,

    /// `max(0, (year - 2000) / 25)`, unbounded above
    pub recency_linear: f64,

    /// `exp(-(current_year - year) / tau)`
    pub recency_decay: f64,

    /// Whether a direct full-text link exists
    pub has_pdf: bool,
}

/// Computes `FeatureVector`s against a fixed reference year
#[derive(Debug, Clone, Copy)]
pub struct FeatureExtractor {
    current_year: i32,
    decay_tau: f64,
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new(current_year(), DEFAULT_DECAY_TAU)
    }
}

impl FeatureExtractor {
    /// Create an extractor; `decay_tau` must be positive (checked at config load)
    pub fn new(current_year: i32, decay_tau: f64) -> Self {
        Self {
            current_year,
            decay_tau,
        }
    }

    pub fn from_config(config: &ScoringConfig) -> Self {
        Self::new(current_year(), config.decay_tau)
    }

    pub fn current_year(&self) -> i32 {
        self.current_year
    }

    /// Lower-cased text the query is compared against: the title when one was
    /// extracted, otherwise a non-empty snippet
    pub fn candidate_text(paper: &PaperRecord) -> Option<String> {
        if paper.has_title() {
            return Some(paper.title.to_lowercase());
        }
        paper
            .snippet
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(str::to_lowercase)
    }

    /// Full feature extraction with edit-style similarity
    pub fn extract(&self, query: &str, paper: &PaperRecord) -> FeatureVector {
        let similarity = match Self::candidate_text(paper) {
            Some(candidate) => sequence_ratio(&query.to_lowercase(), &candidate),
            None => 0.0,
        };
        self.extract_with_similarity(similarity, paper)
    }

    /// Feature extraction with a similarity computed elsewhere (embeddings)
    pub fn extract_with_similarity(&self, similarity: f64, paper: &PaperRecord) -> FeatureVector {
        FeatureVector {
            similarity,
            citation_impact: citation_impact(paper.citation_count),
            citations_per_year: self.citations_per_year(paper.citation_count, paper.year),
            recency_linear: recency_linear(paper.year),
            recency_decay: self.recency_decay(paper.year),
            has_pdf: paper.pdf_link.as_deref().is_some_and(|l| !l.is_empty()),
        }
    }

    /// Raw citations divided by `max(1, current_year - year + 1)`; an unknown
    /// year divides by 1
    pub fn citations_per_year(&self, citations: Option<u64>, year: Option<i32>) -> f64 {
        let Some(count) = citations else {
            return 0.0;
        };
        let age = year.map(|y| self.current_year - y + 1).unwrap_or(1).max(1);
        count as f64 / age as f64
    }

    pub fn recency_decay(&self, year: Option<i32>) -> f64 {
        match year {
            Some(y) => {
                let age = (self.current_year - y).max(0) as f64;
                (-age / self.decay_tau).exp()
            }
            None => 0.0,
        }
    }
}

pub fn citation_impact(citations: Option<u64>) -> f64 {
    citations.map(|c| (c as f64).ln_1p()).unwrap_or(0.0)
}

pub fn recency_linear(year: Option<i32>) -> f64 {
    match year {
        Some(y) => (((y - RECENCY_BASE_YEAR) as f64) / RECENCY_SPAN_YEARS).max(0.0),
        None => 0.0,
    }
}
