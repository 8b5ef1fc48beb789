//! ScholarRank API Gateway
//!
//! HTTP front for the selection pipeline.
//! Handles:
//! - Quick search and full selection requests
//! - CAPTCHA stall reporting and manual resume
//! - Rate limiting
//! - Observability (logging, metrics, request ids)

mod handlers;
mod middleware;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use scholarrank_common::{
    config::{AppConfig, ObservabilityConfig},
    llm::{create_chat_client, Summarizer},
    metrics::{self as app_metrics, LATENCY_BUCKETS},
    PaperSource,
};
use scholarrank_ranking::SelectionPipeline;
use scholarrank_scraper::{create_source, CaptchaGate};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub pipeline: Arc<SelectionPipeline>,
    pub source: Arc<dyn PaperSource>,
    pub summarizer: Arc<Summarizer>,
    pub gate: CaptchaGate,
}

impl AppState {
    /// Wire the source, pipeline and summarizer from configuration
    pub fn from_config(config: AppConfig) -> scholarrank_common::Result<Self> {
        let gate = CaptchaGate::new();
        let source = create_source(&config.scholar, gate.clone())?;

        let chat = create_chat_client(&config.llm)?;
        if chat.is_none() {
            info!("No LLM key configured, rerank and summaries use local fallbacks");
        }

        let pipeline = SelectionPipeline::from_config(&config, chat.clone())?;

        Ok(Self {
            config: Arc::new(config),
            pipeline: Arc::new(pipeline),
            source,
            summarizer: Arc::new(Summarizer::new(chat)),
            gate,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Configuration decides the log format, so it loads first
    let config = AppConfig::load()?;

    init_tracing(&config.observability);
    info!("Starting ScholarRank gateway v{}", scholarrank_common::VERSION);

    // Initialize metrics
    install_metrics_exporter(config.observability.metrics_port)?;
    app_metrics::register_metrics();

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    let state = AppState::from_config(config).map_err(|e| {
        tracing::error!(error = %e, "Failed to initialize application state");
        e
    })?;
    info!(
        source = state.source.name(),
        strategy = state.pipeline.strategy_name(),
        rerank = state.pipeline.has_reranker(),
        "Pipeline ready"
    );

    // Build the router
    let app = create_router(state)?;

    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    if config.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Serve `/metrics` on a separate port
fn install_metrics_exporter(port: u16) -> anyhow::Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(SocketAddr::from(([0, 0, 0, 0], port)))
        .set_buckets(LATENCY_BUCKETS)?
        .install()?;
    Ok(())
}

/// Create the main application router
fn create_router(state: AppState) -> scholarrank_common::Result<Router> {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    // API routes
    let mut api_routes = Router::new()
        .route("/search", get(handlers::search::search))
        .route("/select", post(handlers::select::select))
        .route("/captcha", get(handlers::captcha::status))
        .route("/captcha/resume", post(handlers::captcha::resume));

    if state.config.rate_limit.enabled {
        let limit = middleware::create_rate_limiter(&state.config.rate_limit)?;
        api_routes = api_routes.route_layer(from_fn_with_state(limit, middleware::rate_limit_middleware));
    } else {
        warn!("Rate limiting disabled");
    }

    // Compose the app
    let router = Router::new()
        .route("/ping", get(handlers::health::ping))
        .route("/health", get(handlers::health::health))
        .nest("/v1", api_routes)
        .route_layer(from_fn(middleware::track_metrics))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // outermost: the id must exist before propagation reads it
        .layer(propagate_id)
        .layer(request_id)
        .with_state(state);

    Ok(router)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use scholarrank_common::config::ScoringConfig;
    use scholarrank_common::llm::MockChatClient;
    use scholarrank_common::{ChatClient, PaperRecord, SortOrder};
    use scholarrank_ranking::scoring::create_strategy;
    use scholarrank_scraper::StaticSource;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn pool() -> Vec<PaperRecord> {
        vec![
            PaperRecord::new("Bayesian regression").with_citations(10).with_year(2020),
            PaperRecord::new("Deep learning survey").with_citations(5000).with_year(2016),
            PaperRecord::new("Bayesian regression with priors")
                .with_citations(40)
                .with_year(2022)
                .with_pdf_link("https://example.org/priors.pdf"),
        ]
    }

    fn state_with(source: Arc<dyn PaperSource>, chat: Option<Arc<dyn ChatClient>>) -> AppState {
        let mut config = AppConfig::default();
        config.rate_limit.enabled = false;

        let strategy = create_strategy(&ScoringConfig::default()).unwrap();
        let mut pipeline = SelectionPipeline::new(strategy);
        if let Some(client) = chat.clone() {
            pipeline = pipeline.with_reranker(Arc::new(scholarrank_ranking::pipeline::LlmReranker::new(client)));
        }

        AppState {
            config: Arc::new(config),
            pipeline: Arc::new(pipeline),
            source,
            summarizer: Arc::new(Summarizer::new(chat)),
            gate: CaptchaGate::new(),
        }
    }

    fn test_state() -> AppState {
        let source: Arc<dyn PaperSource> = Arc::new(StaticSource::new(pool()));
        state_with(source, None)
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_ping_and_health() {
        let app = create_router(test_state()).unwrap();

        let response = app
            .clone()
            .oneshot(Request::get("/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        assert_eq!(body_json(response).await, json!({ "message": "pong" }));

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let health = body_json(response).await;
        assert_eq!(health["status"], "healthy");
        assert_eq!(health["source"], "static");
        assert_eq!(health["strategy"], "heuristic");
        assert_eq!(health["captcha"]["state"], "open");
    }

    #[tokio::test]
    async fn test_search_ranks_pool() {
        let app = create_router(test_state()).unwrap();
        let response = app
            .oneshot(
                Request::get("/v1/search?query=bayesian%20regression&max_results=3")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["mode"], "balanced");
        assert_eq!(body["total_results"], 3);
        assert_eq!(body["results"][0]["rank"], 1);
        assert!(body.get("message").is_none());

        let scores: Vec<f64> = body["results"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["score"].as_f64().unwrap())
            .collect();
        assert!(scores.windows(2).all(|w| w[0] >= w[1]));
    }

    #[tokio::test]
    async fn test_search_rejects_oversized_request() {
        let app = create_router(test_state()).unwrap();
        let response = app
            .oneshot(
                Request::get("/v1/search?query=x&max_results=31")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_select_empty_pool_reports_message() {
        let source: Arc<dyn PaperSource> = Arc::new(StaticSource::new(Vec::new()));
        let app = create_router(state_with(source, None)).unwrap();

        let response = app
            .oneshot(post_json("/v1/select", json!({ "query": "anything" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["message"], "no results retrievable");
        assert_eq!(body["results"], json!([]));
        assert_eq!(body["rerank"]["status"], "skipped");
    }

    #[tokio::test]
    async fn test_select_with_custom_weights_and_summary() {
        let app = create_router(test_state()).unwrap();
        let response = app
            .oneshot(post_json(
                "/v1/select",
                json!({
                    "query": "bayesian regression",
                    "weights": { "similarity": 1.0, "citation": 0.0, "recency": 0.0 },
                    "final_count": 2,
                    "summarize": true,
                    "style": "concise"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["weighting"], "custom");
        assert_eq!(body["pool_size"], 3);
        assert_eq!(body["results"].as_array().unwrap().len(), 2);
        assert_eq!(body["results"][0]["title"], "Bayesian regression");
        assert!(body["summary"].as_str().unwrap().contains("Bayesian regression"));
    }

    #[tokio::test]
    async fn test_select_rejects_bad_input() {
        let app = create_router(test_state()).unwrap();

        let both = json!({
            "query": "q",
            "mode": "famous",
            "weights": { "similarity": 1.0, "citation": 0.0, "recency": 0.0 }
        });
        let response = app.clone().oneshot(post_json("/v1/select", both)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let negative = json!({
            "query": "q",
            "weights": { "similarity": -1.0, "citation": 0.5, "recency": 0.5 }
        });
        let response = app.clone().oneshot(post_json("/v1/select", negative)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let zero_count = json!({ "query": "q", "final_count": 0 });
        let response = app.oneshot(post_json("/v1/select", zero_count)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_select_rerank_applies_picks() {
        let mock = Arc::new(MockChatClient::new().reply("[3, 1]"));
        let client: Arc<dyn ChatClient> = mock.clone();
        let source: Arc<dyn PaperSource> = Arc::new(StaticSource::new(pool()));
        let app = create_router(state_with(source, Some(client))).unwrap();

        let response = app
            .oneshot(post_json(
                "/v1/select",
                json!({ "query": "bayesian regression", "mode": "balanced", "rerank": true, "final_count": 2 }),
            ))
            .await
            .unwrap();
        let body = body_json(response).await;

        assert_eq!(body["rerank"]["status"], "applied");
        assert_eq!(body["results"].as_array().unwrap().len(), 2);
        assert_eq!(mock.calls(), 1);
    }

    struct BlockedSource {
        gate: CaptchaGate,
    }

    #[async_trait]
    impl PaperSource for BlockedSource {
        async fn fetch_pool(&self, _query: &str, _pool_size: usize, _sort: SortOrder) -> Vec<PaperRecord> {
            self.gate.mark_blocked("https://scholar.example/scholar?q=x");
            Vec::new()
        }

        fn name(&self) -> &str {
            "blocked"
        }
    }

    #[tokio::test]
    async fn test_captcha_status_and_resume() {
        let gate = CaptchaGate::new();
        let source: Arc<dyn PaperSource> = Arc::new(BlockedSource { gate: gate.clone() });
        let mut state = state_with(source, None);
        state.gate = gate;
        let app = create_router(state).unwrap();

        let response = app
            .clone()
            .oneshot(Request::get("/v1/search?query=x").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(body_json(response).await["message"], "no results retrievable");

        let response = app
            .clone()
            .oneshot(Request::get("/v1/captcha").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(body_json(response).await["state"], "blocked");

        let response = app
            .clone()
            .oneshot(Request::post("/v1/captcha/resume").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["resumed"], true);
        assert_eq!(body["status"]["state"], "open");

        let response = app
            .oneshot(Request::post("/v1/captcha/resume").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(body_json(response).await["resumed"], false);
    }

    #[tokio::test]
    async fn test_rate_limit_rejects_burst() {
        let mut state = test_state();
        let mut config = AppConfig::default();
        config.rate_limit.requests_per_second = 1;
        config.rate_limit.burst = 1;
        state.config = Arc::new(config);
        let app = create_router(state).unwrap();

        let first = app
            .clone()
            .oneshot(Request::get("/v1/captcha").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = app
            .clone()
            .oneshot(Request::get("/v1/captcha").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);

        // health stays outside the limiter
        let health = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(health.status(), StatusCode::OK);
    }
}
