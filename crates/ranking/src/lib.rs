//! ScholarRank ranking core
//!
//! Takes a pool of scraped `PaperRecord`s and a query and produces an ordered
//! shortlist:
//! - `features`: similarity, citation impact and recency per record
//! - `scoring`: interchangeable scoring strategies and weight presets
//! - `ranker`: stable descending sort with truncation
//! - `pipeline`: orchestration plus optional LLM reranking with fallback

pub mod features;
pub mod pipeline;
pub mod ranker;
pub mod scoring;

pub use features::{FeatureExtractor, FeatureVector};
pub use pipeline::{RerankOutcome, Selection, SelectionPipeline, SelectionRequest};
pub use ranker::{rank, ScoredPaper};
pub use scoring::{Mode, ScoringStrategy, ScoringWeights, Weighting};
