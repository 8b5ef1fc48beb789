//! Configuration management for ScholarRank
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config.toml, config.yaml)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Selection pipeline defaults
    #[serde(default)]
    pub selection: SelectionConfig,

    /// Scoring policy configuration
    #[serde(default)]
    pub scoring: ScoringConfig,

    /// Scholarly search engine (scraping collaborator)
    #[serde(default)]
    pub scholar: ScholarConfig,

    /// Chat model used for reranking and summaries
    #[serde(default)]
    pub llm: LlmConfig,

    /// Embedding service configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SelectionConfig {
    /// Mode used when a request names neither a mode nor weights
    #[serde(default = "default_mode")]
    pub default_mode: String,

    /// Number of records requested from the search engine
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// Shortlist size handed to the reranking collaborator
    #[serde(default = "default_filter_top_k")]
    pub filter_top_k: usize,

    /// Upper bound on `filter_top_k`, bounding downstream LLM cost
    #[serde(default = "default_max_filter_top_k")]
    pub max_filter_top_k: usize,

    /// Number of papers returned to the caller
    #[serde(default = "default_final_count")]
    pub final_count: usize,

    /// Whether the LLM reranking step runs by default
    #[serde(default)]
    pub rerank: bool,

    /// Attempts made against the reranking collaborator before falling back
    #[serde(default = "default_rerank_attempts")]
    pub rerank_attempts: u32,

    /// Score records on the rayon pool once the pool reaches this size
    #[serde(default = "default_parallel_threshold")]
    pub parallel_threshold: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScoringConfig {
    /// Scoring strategy: heuristic, semantic, bayesian
    #[serde(default = "default_strategy")]
    pub strategy: String,

    /// Citation feature used by the heuristic strategy: log, per_year
    #[serde(default = "default_citation_policy")]
    pub citation_policy: String,

    /// Recency feature used by the heuristic strategy: linear, decay
    #[serde(default = "default_recency_policy")]
    pub recency_policy: String,

    /// Time constant (years) for exponential recency decay
    #[serde(default = "default_decay_tau")]
    pub decay_tau: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScholarConfig {
    /// Pool source: "scholar" (live pages) or "fixture" (JSON file)
    #[serde(default = "default_source")]
    pub source: String,

    /// JSON array of paper records, used by the fixture source
    #[serde(default)]
    pub fixture_path: Option<String>,

    /// Search results page URL
    #[serde(default = "default_scholar_url")]
    pub base_url: String,

    /// Results per page served by the engine
    #[serde(default = "default_results_per_page")]
    pub results_per_page: usize,

    /// Maximum pages fetched per query
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Request timeout in seconds
    #[serde(default = "default_scholar_timeout")]
    pub timeout_secs: u64,

    /// How long a stalled (CAPTCHA) fetch waits for a resume signal
    #[serde(default = "default_captcha_wait")]
    pub captcha_wait_secs: u64,

    /// User agent header
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    /// Chat completions endpoint
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,

    /// API key (empty disables LLM features)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model name
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Sampling temperature
    #[serde(default = "default_llm_temperature")]
    pub temperature: f32,

    /// Maximum output tokens
    #[serde(default = "default_llm_max_tokens")]
    pub max_tokens: usize,

    /// Request timeout in seconds
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    /// Embedding provider: openai, hashing
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    /// API key for embedding service
    pub api_key: Option<String>,

    /// API base URL (for custom endpoints)
    pub api_base: Option<String>,

    /// Model to use
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Dimension used by the local hashing embedder
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    /// Request timeout in seconds
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries
    #[serde(default = "default_embedding_retries")]
    pub max_retries: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Requests per second (global)
    #[serde(default = "default_rate_limit")]
    pub requests_per_second: u32,

    /// Burst capacity
    #[serde(default = "default_burst")]
    pub burst: u32,

    /// Enable rate limiting
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_request_timeout() -> u64 { 120 }
fn default_mode() -> String { "balanced".to_string() }
fn default_pool_size() -> usize { 50 }
fn default_filter_top_k() -> usize { 30 }
fn default_max_filter_top_k() -> usize { 30 }
fn default_final_count() -> usize { 10 }
fn default_rerank_attempts() -> u32 { 2 }
fn default_parallel_threshold() -> usize { 48 }
fn default_strategy() -> String { "heuristic".to_string() }
fn default_citation_policy() -> String { "log".to_string() }
fn default_recency_policy() -> String { "linear".to_string() }
fn default_decay_tau() -> f64 { 5.0 }
fn default_source() -> String { "scholar".to_string() }
fn default_scholar_url() -> String { "https://scholar.google.com/scholar".to_string() }
fn default_results_per_page() -> usize { 10 }
fn default_max_pages() -> usize { 10 }
fn default_scholar_timeout() -> u64 { 20 }
fn default_captcha_wait() -> u64 { 300 }
fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36".to_string()
}
fn default_llm_endpoint() -> String { "https://api.openai.com/v1/chat/completions".to_string() }
fn default_llm_model() -> String { crate::DEFAULT_CHAT_MODEL.to_string() }
fn default_llm_temperature() -> f32 { 0.3 }
fn default_llm_max_tokens() -> usize { 1000 }
fn default_llm_timeout() -> u64 { 30 }
fn default_embedding_provider() -> String { "hashing".to_string() }
fn default_embedding_model() -> String { crate::DEFAULT_EMBEDDING_MODEL.to_string() }
fn default_embedding_dimension() -> usize { 256 }
fn default_embedding_timeout() -> u64 { 30 }
fn default_embedding_retries() -> u32 { 3 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_metrics_port() -> u16 { 9090 }
fn default_service_name() -> String { "scholarrank".to_string() }
fn default_rate_limit() -> u32 { 5 }
fn default_burst() -> u32 { 10 }
fn default_enabled() -> bool { true }

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__SELECTION__FINAL_COUNT=5
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )

            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would produce nonsensical selections
    pub fn validate(&self) -> Result<(), ConfigError> {
        let selection = &self.selection;
        if selection.pool_size == 0 {
            return Err(ConfigError::Message("selection.pool_size must be positive".into()));
        }
        if selection.filter_top_k == 0 || selection.max_filter_top_k == 0 {
            return Err(ConfigError::Message("selection.filter_top_k must be positive".into()));
        }
        if selection.final_count == 0 {
            return Err(ConfigError::Message("selection.final_count must be positive".into()));
        }
        if selection.rerank_attempts == 0 {
            return Err(ConfigError::Message("selection.rerank_attempts must be positive".into()));
        }
        if !(self.scoring.decay_tau.is_finite() && self.scoring.decay_tau > 0.0) {
            return Err(ConfigError::Message("scoring.decay_tau must be a positive number".into()));
        }
        if self.scholar.source == "fixture" && self.scholar.fixture_path.is_none() {
            return Err(ConfigError::Message("scholar.fixture_path is required for the fixture source".into()));
        }
        if self.scholar.results_per_page == 0 {
            return Err(ConfigError::Message("scholar.results_per_page must be positive".into()));
        }
        if self.rate_limit.enabled && (self.rate_limit.requests_per_second == 0 || self.rate_limit.burst == 0) {
            return Err(ConfigError::Message("rate_limit.requests_per_second and burst must be positive".into()));
        }
        Ok(())
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Whether an LLM key is configured
    pub fn llm_enabled(&self) -> bool {
        self.llm.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            default_mode: default_mode(),
            pool_size: default_pool_size(),
            filter_top_k: default_filter_top_k(),
            max_filter_top_k: default_max_filter_top_k(),
            final_count: default_final_count(),
            rerank: false,
            rerank_attempts: default_rerank_attempts(),
            parallel_threshold: default_parallel_threshold(),
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            strategy: default_strategy(),
            citation_policy: default_citation_policy(),
            recency_policy: default_recency_policy(),
            decay_tau: default_decay_tau(),
        }
    }
}

impl Default for ScholarConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
            fixture_path: None,
            base_url: default_scholar_url(),
            results_per_page: default_results_per_page(),
            max_pages: default_max_pages(),
            timeout_secs: default_scholar_timeout(),
            captcha_wait_secs: default_captcha_wait(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: default_llm_endpoint(),
            api_key: None,
            model: default_llm_model(),
            temperature: default_llm_temperature(),
            max_tokens: default_llm_max_tokens(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            api_key: None,
            api_base: None,
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            timeout_secs: default_embedding_timeout(),
            max_retries: default_embedding_retries(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_port: default_metrics_port(),
            service_name: default_service_name(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_rate_limit(),
            burst: default_burst(),
            enabled: default_enabled(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            selection: SelectionConfig::default(),
            scoring: ScoringConfig::default(),
            scholar: ScholarConfig::default(),
            llm: LlmConfig::default(),
            embedding: EmbeddingConfig::default(),
            observability: ObservabilityConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}
