//! Request middleware

pub mod metrics;
pub mod rate_limit;

pub use self::metrics::track_metrics;
pub use rate_limit::{create_rate_limiter, rate_limit_middleware, RateLimit};
