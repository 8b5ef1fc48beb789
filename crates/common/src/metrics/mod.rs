//! Metrics and observability utilities
//!
//! Provides Prometheus metrics with standardized naming conventions.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all ScholarRank metrics
pub const METRICS_PREFIX: &str = "scholarrank";

/// Histogram buckets for selection latency (in seconds).
/// Scraping and LLM calls dominate, so the upper buckets are wide.
pub const LATENCY_BUCKETS: &[f64] = &[
    0.005,  // 5ms - ranking only
    0.025,  // 25ms
    0.100,  // 100ms
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.500,  // 2.5s
    5.000,  // 5s
    10.00,  // 10s
    30.00,  // 30s
    60.00,  // 60s
    120.0,  // 2min - stalled page fetch
];

/// Register all metric descriptions
pub fn register_metrics() {
    // Request metrics
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    // Selection metrics
    describe_counter!(
        format!("{}_selections_total", METRICS_PREFIX),
        Unit::Count,
        "Total selection pipeline runs"
    );

    describe_histogram!(
        format!("{}_selection_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Selection pipeline latency in seconds"
    );

    describe_gauge!(
        format!("{}_pool_size", METRICS_PREFIX),
        Unit::Count,
        "Number of records in the last scored pool"
    );

    // Rerank metrics
    describe_counter!(
        format!("{}_rerank_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total reranking collaborator calls"
    );

    describe_counter!(
        format!("{}_rerank_fallbacks_total", METRICS_PREFIX),
        Unit::Count,
        "Reranks that fell back to the local ranking"
    );

    // Scraper metrics
    describe_counter!(
        format!("{}_scrape_pages_total", METRICS_PREFIX),
        Unit::Count,
        "Result pages fetched from the search engine"
    );

    describe_counter!(
        format!("{}_scrape_failures_total", METRICS_PREFIX),
        Unit::Count,
        "Result page fetches that failed or were blocked"
    );

    // Embedding metrics
    describe_counter!(
        format!("{}_embedding_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total embedding API requests"
    );

    describe_histogram!(
        format!("{}_embedding_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Embedding generation latency in seconds"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Helper to record selection metrics
pub fn record_selection(duration_secs: f64, strategy: &str, pool_size: usize) {
    counter!(
        format!("{}_selections_total", METRICS_PREFIX),
        "strategy" => strategy.to_string()
    )
    .increment(1);

    histogram!(
        format!("{}_selection_duration_seconds", METRICS_PREFIX),
        "strategy" => strategy.to_string()
    )
    .record(duration_secs);

    gauge!(format!("{}_pool_size", METRICS_PREFIX)).set(pool_size as f64);
}

/// Helper to record rerank outcomes
pub fn record_rerank(fell_back: bool) {
    counter!(format!("{}_rerank_requests_total", METRICS_PREFIX)).increment(1);

    if fell_back {
        counter!(format!("{}_rerank_fallbacks_total", METRICS_PREFIX)).increment(1);
    }
}

/// Helper to record a fetched result page
pub fn record_scrape(success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_scrape_pages_total", METRICS_PREFIX),
        "status" => status.to_string()
    )
    .increment(1);

    if !success {
        counter!(format!("{}_scrape_failures_total", METRICS_PREFIX)).increment(1);
    }
}

/// Helper to record embedding metrics
pub fn record_embedding(duration_secs: f64, model: &str, batch_size: usize) {
    counter!(
        format!("{}_embedding_requests_total", METRICS_PREFIX),
        "model" => model.to_string()
    )
    .increment(1);

    histogram!(
        format!("{}_embedding_duration_seconds", METRICS_PREFIX),
        "model" => model.to_string(),
        "batch" => if batch_size > 1 { "batch" } else { "single" }
    )
    .record(duration_secs);
}
