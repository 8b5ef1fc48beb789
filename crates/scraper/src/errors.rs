//! Scraper error types

use scholarrank_common::errors::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Blocked by the search engine at {url}")]
    Blocked { url: String },

    #[error("Invalid selector {selector}: {message}")]
    Selector { selector: String, message: String },

    #[error("Invalid URL {url}: {message}")]
    Url { url: String, message: String },

    #[error("Fixture error: {0}")]
    Fixture(String),
}

impl From<ScrapeError> for AppError {
    fn from(e: ScrapeError) -> Self {
        match e {
            ScrapeError::Selector { .. } | ScrapeError::Url { .. } | ScrapeError::Fixture(_) => {
                AppError::Configuration { message: e.to_string() }
            }
            other => AppError::ScholarError {
                message: other.to_string(),
            },
        }
    }
}
