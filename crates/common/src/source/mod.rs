//! Paper pool sources
//!
//! A source turns a query into a pool of `PaperRecord`s. Fetching may block
//! for a long time (a human solving a CAPTCHA), but it never fails towards
//! the caller: total failure is an empty pool.

use crate::models::PaperRecord;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Result ordering requested from the search engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Relevance,
    Date,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Relevance => write!(f, "relevance"),
            SortOrder::Date => write!(f, "date"),
        }
    }
}

impl FromStr for SortOrder {
    type Err = crate::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "relevance" => Ok(SortOrder::Relevance),
            "date" => Ok(SortOrder::Date),
            other => Err(crate::AppError::validation(
                "sort_by",
                format!("unknown sort order '{}', expected relevance or date", other),
            )),
        }
    }
}

/// Anything that can produce a pool of papers for a query
#[async_trait]
pub trait PaperSource: Send + Sync {
    /// Fetch up to `pool_size` records. Returns an empty pool on failure.
    async fn fetch_pool(&self, query: &str, pool_size: usize, sort: SortOrder) -> Vec<PaperRecord>;

    /// Source identifier, for logs
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_order_parsing() {
        assert_eq!("date".parse::<SortOrder>().unwrap(), SortOrder::Date);
        assert_eq!(" Relevance ".parse::<SortOrder>().unwrap(), SortOrder::Relevance);
        assert!("citations".parse::<SortOrder>().is_err());
        assert_eq!(SortOrder::default().to_string(), "relevance");
    }
}
