//! Reading-list summaries for a final selection
//!
//! The model is asked to restate each paper with a short summary, using only
//! the fields we scraped. Without a model, or when the call fails, a plain
//! listing is produced instead.

use super::ChatClient;
use crate::models::PaperRecord;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Summary style
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryStyle {
    /// One line per paper
    Concise,
    /// Title, authors/year, link and a short summary
    #[default]
    Detailed,
}

/// Formats a selection as a reading list
pub struct Summarizer {
    client: Option<Arc<dyn ChatClient>>,
}

impl Summarizer {
    pub fn new(client: Option<Arc<dyn ChatClient>>) -> Self {
        Self { client }
    }

    /// Summarize `papers` for `query`. Never fails.
    pub async fn summarize(&self, query: &str, papers: &[PaperRecord], style: SummaryStyle) -> String {
        if papers.is_empty() {
            return "No papers selected.".to_string();
        }

        let Some(client) = &self.client else {
            return plain_listing(papers, style);
        };

        let prompt = build_prompt(query, papers, style);
        match client.complete(&prompt).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                tracing::warn!(model = client.model_name(), "Empty summary, using plain listing");
                plain_listing(papers, style)
            }
            Err(e) => {
                tracing::warn!(model = client.model_name(), error = %e, "Summary failed, using plain listing");
                plain_listing(papers, style)
            }
        }
    }
}

fn build_prompt(query: &str, papers: &[PaperRecord], style: SummaryStyle) -> String {
    let style_instruction = match style {
        SummaryStyle::Concise => "Give one line per paper: title, authors/year and link.",
        SummaryStyle::Detailed => {
            "For each paper give the title, the authors/year, the link and a short summary of two sentences at most."
        }
    };

    let mut entries = String::new();
    for (i, paper) in papers.iter().enumerate() {
        entries.push_str(&format!(
            "[{}] title: {}\n    authors/year: {}\n    link: {}\n    snippet: {}\n",
            i + 1,
            paper.title,
            paper.authors_year.as_deref().unwrap_or("unknown"),
            paper.best_link().unwrap_or("none"),
            paper.snippet.as_deref().unwrap_or(""),
        ));
    }

    format!(
        "You are a research assistant. The user searched for \"{query}\".\n\
         List the papers below clearly, in the given order, using only the information provided.\n\
         {style_instruction}\n\n\
         Papers:\n{entries}"
    )
}

/// Deterministic listing used without a model
pub fn plain_listing(papers: &[PaperRecord], style: SummaryStyle) -> String {
    let mut out = String::new();
    for (i, paper) in papers.iter().enumerate() {
        let authors = paper.authors_year.as_deref().unwrap_or("unknown");
        let link = paper.best_link().unwrap_or("no link");
        match style {
            SummaryStyle::Concise => {
                out.push_str(&format!("{}. {} ({}) {}\n", i + 1, paper.title, authors, link));
            }
            SummaryStyle::Detailed => {
                out.push_str(&format!(
                    "{}. {}\n   Authors/Year: {}\n   Link: {}\n   Citations: {}\n",
                    i + 1,
                    paper.title,
                    authors,
                    link,
                    paper.citations_display(),
                ));
                if let Some(snippet) = paper.snippet.as_deref().filter(|s| !s.trim().is_empty()) {
                    out.push_str(&format!("   Summary: {}\n", snippet.trim()));
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockChatClient;

    fn papers() -> Vec<PaperRecord> {
        vec![
            PaperRecord::new("Bayesian Linear Regression")
                .with_authors_year("A Smith - 2019")
                .with_snippet("Posterior inference for linear models.")
                .with_pdf_link("https://example.org/a.pdf"),
            PaperRecord::new("Deep Kernels"),
        ]
    }

    #[tokio::test]
    async fn test_plain_listing_without_client() {
        let summarizer = Summarizer::new(None);
        let text = summarizer.summarize("bayes", &papers(), SummaryStyle::Detailed).await;

        assert!(text.starts_with("1. Bayesian Linear Regression"));
        assert!(text.contains("Link: https://example.org/a.pdf"));
        assert!(text.contains("Summary: Posterior inference"));
        assert!(text.contains("2. Deep Kernels"));
        assert!(text.contains("Citations: unknown"));
    }

    #[tokio::test]
    async fn test_uses_model_reply() {
        let mock = Arc::new(MockChatClient::new().reply("1. Bayesian Linear Regression - nice"));
        let client: Arc<dyn ChatClient> = mock.clone();
        let summarizer = Summarizer::new(Some(client));
        let text = summarizer.summarize("bayes", &papers(), SummaryStyle::Concise).await;

        assert_eq!(text, "1. Bayesian Linear Regression - nice");
        let prompt = &mock.prompts()[0];
        assert!(prompt.contains("\"bayes\""));
        assert!(prompt.contains("[2] title: Deep Kernels"));
    }

    #[tokio::test]
    async fn test_falls_back_on_failure() {
        let client: Arc<dyn ChatClient> = Arc::new(MockChatClient::new().fail("down"));
        let summarizer = Summarizer::new(Some(client));
        let text = summarizer.summarize("bayes", &papers(), SummaryStyle::Concise).await;

        assert_eq!(text, plain_listing(&papers(), SummaryStyle::Concise));
    }

    #[tokio::test]
    async fn test_empty_selection() {
        let summarizer = Summarizer::new(None);
        assert_eq!(
            summarizer.summarize("q", &[], SummaryStyle::Detailed).await,
            "No papers selected."
        );
    }
}
