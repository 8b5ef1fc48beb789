//! ScholarRank Common Library
//!
//! Shared code for all ScholarRank crates including:
//! - Paper record model and field normalization
//! - Error types and handling
//! - Configuration management
//! - Chat (LLM) client abstraction
//! - Embedding client abstraction
//! - Paper pool source abstraction
//! - Metrics and observability

pub mod config;
pub mod embeddings;
pub mod errors;
pub mod llm;
pub mod metrics;
pub mod models;
pub mod source;

// Re-export commonly used types
pub use errors::{AppError, Result};
pub use config::AppConfig;
pub use embeddings::Embedder;
pub use llm::ChatClient;
pub use models::{PaperRecord, NO_TITLE};
pub use source::{PaperSource, SortOrder};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default chat model used for reranking and summaries
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";

/// Default embedding model
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
