//! Selection pipeline
//!
//! pool -> features -> scores -> shortlist (`filter_top_k`) -> optional
//! rerank -> final selection (`final_count`).
//!
//! Every call is a fresh transform over an immutable pool. Feature
//! extraction runs on the rayon pool for large inputs; results are collected
//! in pool order so tie-breaking never depends on worker timing.

mod rerank;

pub use rerank::{compact_entry, parse_indices, valid_picks, LlmReranker, Reranker};

use crate::features::{cosine_similarity, FeatureExtractor, FeatureVector};
use crate::ranker::{rank, ScoredPaper};
use crate::scoring::{create_strategy, ScoringStrategy, ScoringWeights, SimilaritySource, Weighting};
use rayon::prelude::*;
use scholarrank_common::config::{AppConfig, SelectionConfig};
use scholarrank_common::embeddings::create_embedder;
use scholarrank_common::{AppError, ChatClient, Embedder, PaperRecord, PaperSource, Result, SortOrder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Parameters of one selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionRequest {
    /// Records requested from the source
    pub pool_size: usize,
    /// Shortlist length handed to the reranker (capped by configuration)
    pub filter_top_k: usize,
    /// Maximum number of records returned
    pub final_count: usize,
    #[serde(default)]
    pub weighting: Weighting,
    /// Ask the reranker, when one is configured
    #[serde(default)]
    pub rerank: bool,
    #[serde(default)]
    pub sort: SortOrder,
}

impl SelectionRequest {
    /// Defaults from configuration
    pub fn from_config(config: &SelectionConfig) -> Result<Self> {
        Ok(Self {
            pool_size: config.pool_size,
            filter_top_k: config.filter_top_k,
            final_count: config.final_count,
            weighting: Weighting::Mode(config.default_mode.parse()?),
            rerank: config.rerank,
            sort: SortOrder::default(),
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.pool_size == 0 {
            return Err(AppError::validation("pool_size", "must be a positive integer"));
        }
        if self.filter_top_k == 0 {
            return Err(AppError::validation("filter_top_k", "must be a positive integer"));
        }
        if self.final_count == 0 {
            return Err(AppError::validation("final_count", "must be a positive integer"));
        }
        self.weighting.resolve().map(|_| ())
    }
}

/// What happened at the rerank step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RerankOutcome {
    /// Not requested, or no reranker configured
    Skipped,
    /// The reranker's picks were used
    Applied { attempts: u32 },
    /// Every attempt failed; the local order was kept
    FellBack { attempts: u32 },
}

/// Result of a selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Selection {
    pub papers: Vec<ScoredPaper>,
    pub pool_size: usize,
    pub shortlist_size: usize,
    pub rerank: RerankOutcome,
}

impl Selection {
    fn empty() -> Self {
        Self {
            papers: Vec::new(),
            pool_size: 0,
            shortlist_size: 0,
            rerank: RerankOutcome::Skipped,
        }
    }

    /// The selected records, in order
    pub fn records(&self) -> Vec<PaperRecord> {
        self.papers.iter().map(|s| s.paper.clone()).collect()
    }
}

/// Ranking and selection pipeline
pub struct SelectionPipeline {
    extractor: FeatureExtractor,
    strategy: Arc<dyn ScoringStrategy>,
    embedder: Option<Arc<dyn Embedder>>,
    reranker: Option<Arc<dyn Reranker>>,
    max_filter_top_k: usize,
    rerank_attempts: u32,
    parallel_threshold: usize,
}

impl SelectionPipeline {
    /// Pipeline with default limits and no collaborators
    pub fn new(strategy: Arc<dyn ScoringStrategy>) -> Self {
        let defaults = SelectionConfig::default();
        Self {
            extractor: FeatureExtractor::default(),
            strategy,
            embedder: None,
            reranker: None,
            max_filter_top_k: defaults.max_filter_top_k,
            rerank_attempts: defaults.rerank_attempts,
            parallel_threshold: defaults.parallel_threshold,
        }
    }

    /// Wire the pipeline from configuration. `chat` enables LLM reranking.
    pub fn from_config(config: &AppConfig, chat: Option<Arc<dyn ChatClient>>) -> Result<Self> {
        let strategy = create_strategy(&config.scoring)?;

        let embedder = match strategy.similarity_source() {
            SimilaritySource::Embedding => Some(create_embedder(&config.embedding)?),
            SimilaritySource::Sequence => None,
        };

        let reranker = chat.map(|client| {
            let reranker: Arc<dyn Reranker> = Arc::new(LlmReranker::new(client));
            reranker
        });

        Ok(Self {
            extractor: FeatureExtractor::from_config(&config.scoring),
            strategy,
            embedder,
            reranker,
            max_filter_top_k: config.selection.max_filter_top_k,
            rerank_attempts: config.selection.rerank_attempts.max(1),
            parallel_threshold: config.selection.parallel_threshold,
        })
    }

    pub fn with_extractor(mut self, extractor: FeatureExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn with_reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    pub fn with_rerank_attempts(mut self, attempts: u32) -> Self {
        self.rerank_attempts = attempts.max(1);
        self
    }

    pub fn with_max_filter_top_k(mut self, max_filter_top_k: usize) -> Self {
        self.max_filter_top_k = max_filter_top_k.max(1);
        self
    }

    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    pub fn has_reranker(&self) -> bool {
        self.reranker.is_some()
    }

    /// Fetch a pool from `source` and select from it
    pub async fn select_papers(
        &self,
        source: &dyn PaperSource,
        query: &str,
        request: &SelectionRequest,
    ) -> Result<Selection> {
        request.validate()?;

        let pool = source.fetch_pool(query, request.pool_size, request.sort).await;
        tracing::info!(
            source = source.name(),
            query = %query,
            fetched = pool.len(),
            requested = request.pool_size,
            "Pool fetched"
        );

        self.select(query, pool, request).await
    }

    /// Select from an already materialized pool
    pub async fn select(&self, query: &str, pool: Vec<PaperRecord>, request: &SelectionRequest) -> Result<Selection> {
        request.validate()?;
        let weights = request.weighting.resolve()?;

        if pool.is_empty() {
            return Ok(Selection::empty());
        }

        let start = Instant::now();
        let pool_size = pool.len();
        let top_k = request.filter_top_k.min(self.max_filter_top_k);

        let shortlist = self.shortlist(query, pool, &weights, top_k).await;
        let shortlist_size = shortlist.len();

        let (papers, rerank) = if request.rerank {
            self.rerank_shortlist(query, shortlist, request.final_count).await
        } else {
            (head(shortlist, request.final_count), RerankOutcome::Skipped)
        };

        let elapsed = start.elapsed();
        scholarrank_common::metrics::record_selection(elapsed.as_secs_f64(), self.strategy.name(), pool_size);

        tracing::info!(
            query = %query,
            strategy = self.strategy.name(),
            weighting = request.weighting.label(),
            pool_size,
            shortlist_size,
            selected = papers.len(),
            rerank = ?rerank,
            latency_ms = elapsed.as_millis() as u64,
            "Selection complete"
        );

        Ok(Selection {
            papers,
            pool_size,
            shortlist_size,
            rerank,
        })
    }

    /// Score the whole pool and keep the best `top_k`
    pub async fn shortlist(
        &self,
        query: &str,
        pool: Vec<PaperRecord>,
        weights: &ScoringWeights,
        top_k: usize,
    ) -> Vec<ScoredPaper> {
        let features = self.features(query, &pool).await;
        let scores = self.strategy.score_pool(&features, weights);

        let scored: Vec<ScoredPaper> = pool
            .into_iter()
            .zip(features)
            .zip(scores)
            .map(|((paper, features), score)| ScoredPaper {
                paper,
                score,
                features,
            })
            .collect();

        rank(scored, top_k)
    }

    async fn features(&self, query: &str, pool: &[PaperRecord]) -> Vec<FeatureVector> {
        if self.strategy.similarity_source() == SimilaritySource::Embedding {
            match self.embedding_similarities(query, pool).await {
                Ok(similarities) => {
                    return pool
                        .iter()
                        .zip(similarities)
                        .map(|(paper, similarity)| self.extractor.extract_with_similarity(similarity, paper))
                        .collect();
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Embedding similarity unavailable, using sequence ratio");
                }
            }
        }

        let extractor = self.extractor;
        if pool.len() >= self.parallel_threshold {
            pool.par_iter().map(|paper| extractor.extract(query, paper)).collect()
        } else {
            pool.iter().map(|paper| extractor.extract(query, paper)).collect()
        }
    }

    /// Cosine similarity of each record's candidate text to the query; 0.0
    /// for records with neither title nor snippet
    async fn embedding_similarities(&self, query: &str, pool: &[PaperRecord]) -> Result<Vec<f64>> {
        let embedder = self.embedder.as_ref().ok_or_else(|| AppError::Configuration {
            message: format!("strategy '{}' needs an embedder", self.strategy.name()),
        })?;

        let candidates: Vec<Option<String>> = pool.iter().map(FeatureExtractor::candidate_text).collect();
        let texts: Vec<String> = candidates.iter().flatten().cloned().collect();

        let query_vector = embedder.embed(&query.to_lowercase()).await?;
        let vectors = embedder.embed_batch(&texts).await?;
        if vectors.len() != texts.len() {
            return Err(AppError::EmbeddingError {
                message: format!("expected {} embeddings, got {}", texts.len(), vectors.len()),
            });
        }

        let mut vectors = vectors.into_iter();
        Ok(candidates
            .iter()
            .map(|candidate| match candidate {
                Some(_) => vectors
                    .next()
                    .map(|v| cosine_similarity(&query_vector, &v))
                    .unwrap_or(0.0),
                None => 0.0,
            })
            .collect())
    }

    /// Ask the reranker, retrying a bounded number of times. Falls back to
    /// the first `final_count` of the shortlist, in shortlist order.
    async fn rerank_shortlist(
        &self,
        query: &str,
        shortlist: Vec<ScoredPaper>,
        final_count: usize,
    ) -> (Vec<ScoredPaper>, RerankOutcome) {
        let Some(reranker) = &self.reranker else {
            tracing::debug!("Rerank requested but no reranker configured");
            return (head(shortlist, final_count), RerankOutcome::Skipped);
        };

        for attempt in 1..=self.rerank_attempts {
            match reranker.rerank(query, &shortlist, final_count).await {
                Ok(raw) => {
                    let picks = valid_picks(&raw, shortlist.len(), final_count);
                    if !picks.is_empty() {
                        scholarrank_common::metrics::record_rerank(false);
                        let papers = picks.into_iter().map(|i| shortlist[i].clone()).collect();
                        return (papers, RerankOutcome::Applied { attempts: attempt });
                    }
                    tracing::warn!(
                        reranker = reranker.name(),
                        attempt,
                        raw = ?raw,
                        "Rerank returned no usable positions"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        reranker = reranker.name(),
                        attempt,
                        max_attempts = self.rerank_attempts,
                        error = %e,
                        "Rerank attempt failed"
                    );
                }
            }
        }

        scholarrank_common::metrics::record_rerank(true);
        (
            head(shortlist, final_count),
            RerankOutcome::FellBack {
                attempts: self.rerank_attempts,
            },
        )
    }
}

fn head(mut ranked: Vec<ScoredPaper>, n: usize) -> Vec<ScoredPaper> {
    ranked.truncate(n);
    ranked
}
