//! ScholarRank scraper
//!
//! Pool sources for the selection pipeline:
//! - `ScholarSource`: live result pages, fetched with reqwest and parsed
//!   with `scraper`
//! - `StaticSource`: a fixed pool (JSON fixture or in memory)
//! - `CaptchaGate`: explicit stall/resume channel for challenge pages

pub mod captcha;
pub mod errors;
pub mod extract;
pub mod fixture;
pub mod scholar;

pub use captcha::{CaptchaGate, GateStatus};
pub use errors::ScrapeError;
pub use fixture::StaticSource;
pub use scholar::ScholarSource;

use scholarrank_common::config::ScholarConfig;
use scholarrank_common::{AppError, PaperSource, Result};
use std::sync::Arc;

/// Build the configured pool source
pub fn create_source(config: &ScholarConfig, gate: CaptchaGate) -> Result<Arc<dyn PaperSource>> {
    let source: Arc<dyn PaperSource> = match config.source.as_str() {
        "scholar" => Arc::new(ScholarSource::new(config.clone())?.with_gate(gate)),
        "fixture" => {
            let path = config.fixture_path.as_deref().ok_or_else(|| AppError::Configuration {
                message: "scholar.fixture_path is not set".to_string(),
            })?;
            Arc::new(StaticSource::from_json_file(path)?)
        }
        other => {
            return Err(AppError::Configuration {
                message: format!("Unknown pool source: {}", other),
            })
        }
    };
    Ok(source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_source() {
        let source = create_source(&ScholarConfig::default(), CaptchaGate::new()).unwrap();
        assert_eq!(source.name(), "scholar");

        let config = ScholarConfig {
            source: "fixture".to_string(),
            fixture_path: None,
            ..ScholarConfig::default()
        };
        assert!(create_source(&config, CaptchaGate::new()).is_err());

        let config = ScholarConfig {
            source: "bing".to_string(),
            ..ScholarConfig::default()
        };
        assert!(create_source(&config, CaptchaGate::new()).is_err());
    }
}
