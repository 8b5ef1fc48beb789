//! In-memory pool source for demos, offline runs and tests

use crate::errors::ScrapeError;
use async_trait::async_trait;
use scholarrank_common::{PaperRecord, PaperSource, SortOrder};
use std::path::Path;

/// Serves a fixed pool, ignoring the query
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    records: Vec<PaperRecord>,
}

impl StaticSource {
    pub fn new(records: Vec<PaperRecord>) -> Self {
        Self { records }
    }

    /// Load a JSON array of records. Field names follow the scraped-record
    /// shape (`link`, `scholar_link`, `citations` are accepted aliases).
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ScrapeError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ScrapeError::Fixture(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&raw).map_err(|e| ScrapeError::Fixture(format!("{}: {}", path.display(), e)))
    }

    pub fn from_json(raw: &str) -> Result<Self, ScrapeError> {
        let mut records: Vec<PaperRecord> =
            serde_json::from_str(raw).map_err(|e| ScrapeError::Fixture(e.to_string()))?;

        // Same normalization the page extractor applies
        for record in &mut records {
            if record.title.trim().is_empty() {
                record.title = scholarrank_common::NO_TITLE.to_string();
            }
            if record.year.is_none() {
                record.year = record
                    .authors_year
                    .as_deref()
                    .and_then(scholarrank_common::models::extract_year);
            }
        }
        Ok(Self::new(records))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl PaperSource for StaticSource {
    async fn fetch_pool(&self, _query: &str, pool_size: usize, sort: SortOrder) -> Vec<PaperRecord> {
        let mut pool = self.records.clone();
        if sort == SortOrder::Date {
            // newest first, unknown years last, stable otherwise
            pool.sort_by_key(|r| std::cmp::Reverse(r.year.unwrap_or(i32::MIN)));
        }
        pool.truncate(pool_size);
        pool
    }

    fn name(&self) -> &str {
        "static"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scholarrank_common::NO_TITLE;
    use tokio_test::assert_err;

    const POOL: &str = r#"[
        {"title": "Bayesian Regression Basics", "citations": 50, "year": 2020},
        {"title": "Unrelated Topic", "citations": 500, "year": 2023},
        {"title": "", "authors_year": "J Doe - 2011 - Wiley", "link": "https://example.org/x"}
    ]"#;

    #[tokio::test]
    async fn test_static_pool_truncates() {
        let source = StaticSource::from_json(POOL).unwrap();
        assert_eq!(source.len(), 3);

        let pool = source.fetch_pool("ignored", 2, SortOrder::Relevance).await;
        assert_eq!(pool.len(), 2);
        assert_eq!(pool[0].title, "Bayesian Regression Basics");
    }

    #[tokio::test]
    async fn test_normalization_and_date_sort() {
        let source = StaticSource::from_json(POOL).unwrap();
        let pool = source.fetch_pool("ignored", 10, SortOrder::Date).await;

        let years: Vec<Option<i32>> = pool.iter().map(|r| r.year).collect();
        assert_eq!(years, vec![Some(2023), Some(2020), Some(2011)]);
        assert_eq!(pool[2].title, NO_TITLE);
        assert_eq!(pool[2].primary_link.as_deref(), Some("https://example.org/x"));
    }

    #[tokio::test]
    async fn test_bundled_demo_pool_loads() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../demos/pool.json");
        let source = StaticSource::from_json_file(path).unwrap();
        assert_eq!(source.len(), 7);

        let pool = source.fetch_pool("bayesian regression", 50, SortOrder::Date).await;
        assert_eq!(pool[0].year, Some(2024));
        assert!(pool.iter().any(|r| r.title == NO_TITLE && r.year == Some(2023)));
    }

    #[test]
    fn test_bad_fixture() {
        assert_err!(StaticSource::from_json("{not json"));
        assert_err!(StaticSource::from_json_file("/definitely/missing.json"));
    }
}
