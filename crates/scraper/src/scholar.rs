//! Live scholarly search source
//!
//! Fetches result pages over HTTP and extracts records page by page until the
//! pool is full, the engine runs out of results, or something goes wrong.
//! Failures end the fetch early; the caller always gets a (possibly empty)
//! pool.

use crate::captcha::CaptchaGate;
use crate::errors::ScrapeError;
use crate::extract::{parse_results, ParsedPage};
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use scholarrank_common::config::ScholarConfig;
use scholarrank_common::metrics::record_scrape;
use scholarrank_common::{PaperRecord, PaperSource, Result, SortOrder};
use std::time::{Duration, Instant};

pub struct ScholarSource {
    client: reqwest::Client,
    config: ScholarConfig,
    gate: Option<CaptchaGate>,
}

impl ScholarSource {
    pub fn new(config: ScholarConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            config,
            gate: None,
        })
    }

    /// Stall on challenge pages until `gate` is resumed
    pub fn with_gate(mut self, gate: CaptchaGate) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Result page URL for the page starting at `start`
    pub fn page_url(&self, query: &str, start: usize, sort: SortOrder) -> std::result::Result<Url, ScrapeError> {
        let mut url = Url::parse(&self.config.base_url).map_err(|e| ScrapeError::Url {
            url: self.config.base_url.clone(),
            message: e.to_string(),
        })?;

        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("q", query)
                .append_pair("hl", "en")
                .append_pair("num", &self.config.results_per_page.to_string());
            if start > 0 {
                pairs.append_pair("start", &start.to_string());
            }
            if sort == SortOrder::Date {
                pairs.append_pair("scisbd", "1");
            }
        }
        Ok(url)
    }

    async fn fetch_page(&self, url: &Url) -> std::result::Result<ParsedPage, ScrapeError> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::SERVICE_UNAVAILABLE {
            return Err(ScrapeError::Blocked { url: url.to_string() });
        }
        if !status.is_success() {
            return Err(ScrapeError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let html = response.text().await?;
        let page = parse_results(&html, url.as_str())?;
        if page.blocked {
            return Err(ScrapeError::Blocked { url: url.to_string() });
        }
        Ok(page)
    }

    /// Fetch a page; on a challenge, wait for the gate once and retry
    async fn fetch_page_with_gate(&self, url: &Url) -> std::result::Result<ParsedPage, ScrapeError> {
        match self.fetch_page(url).await {
            Err(ScrapeError::Blocked { url: blocked }) => {
                let Some(gate) = &self.gate else {
                    return Err(ScrapeError::Blocked { url: blocked });
                };
                gate.mark_blocked(&blocked);
                let wait = Duration::from_secs(self.config.captcha_wait_secs);
                if gate.wait_until_open(wait).await {
                    self.fetch_page(url).await
                } else {
                    Err(ScrapeError::Blocked { url: blocked })
                }
            }
            other => other,
        }
    }
}

#[async_trait]
impl PaperSource for ScholarSource {
    async fn fetch_pool(&self, query: &str, pool_size: usize, sort: SortOrder) -> Vec<PaperRecord> {
        let start = Instant::now();
        let per_page = self.config.results_per_page.max(1);
        let mut pool: Vec<PaperRecord> = Vec::with_capacity(pool_size);

        for page in 0..self.config.max_pages {
            if pool.len() >= pool_size {
                break;
            }

            let url = match self.page_url(query, page * per_page, sort) {
                Ok(url) => url,
                Err(e) => {
                    tracing::error!(error = %e, "Cannot build result page URL");
                    break;
                }
            };

            match self.fetch_page_with_gate(&url).await {
                Ok(parsed) => {
                    record_scrape(true);
                    let found = parsed.records.len();
                    tracing::debug!(page, found, "Result page parsed");
                    pool.extend(parsed.records);
                    if found < per_page {
                        break;
                    }
                }
                Err(e) => {
                    record_scrape(false);
                    tracing::warn!(page, error = %e, collected = pool.len(), "Result page fetch failed, stopping");
                    break;
                }
            }
        }

        pool.truncate(pool_size);
        tracing::info!(
            query = %query,
            sort = %sort,
            collected = pool.len(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Scholar pool fetched"
        );
        pool
    }

    fn name(&self) -> &str {
        "scholar"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> ScholarSource {
        ScholarSource::new(ScholarConfig::default()).unwrap()
    }

    #[test]
    fn test_page_url_relevance() {
        let url = source().page_url("bayesian regression", 0, SortOrder::Relevance).unwrap();
        assert_eq!(
            url.as_str(),
            "https://scholar.google.com/scholar?q=bayesian+regression&hl=en&num=10"
        );
    }

    #[test]
    fn test_page_url_date_and_offset() {
        let url = source().page_url("gp", 20, SortOrder::Date).unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("start".to_string(), "20".to_string())));
        assert!(pairs.contains(&("scisbd".to_string(), "1".to_string())));
    }

    #[test]
    fn test_bad_base_url() {
        let config = ScholarConfig {
            base_url: "::".to_string(),
            ..ScholarConfig::default()
        };
        let source = ScholarSource::new(config).unwrap();
        assert!(source.page_url("q", 0, SortOrder::Relevance).is_err());
    }

    #[tokio::test]
    async fn test_unreachable_engine_yields_empty_pool() {
        let config = ScholarConfig {
            base_url: "http://127.0.0.1:9/scholar".to_string(),
            timeout_secs: 2,
            max_pages: 2,
            ..ScholarConfig::default()
        };
        let source = ScholarSource::new(config).unwrap();
        let pool = source.fetch_pool("anything", 10, SortOrder::Relevance).await;
        assert!(pool.is_empty());
    }
}
