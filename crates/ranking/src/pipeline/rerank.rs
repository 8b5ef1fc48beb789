//! Reranking collaborators
//!
//! A reranker sees the ranked shortlist and answers with 1-based positions
//! into it, best first. Its answer is untrusted: the pipeline drops positions
//! outside the shortlist and repeated positions.

use crate::ranker::ScoredPaper;
use async_trait::async_trait;
use regex_lite::Regex;
use scholarrank_common::{AppError, ChatClient, Result};
use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

/// Longest snippet excerpt sent to the model
const SNIPPET_CHARS: usize = 200;

/// Reorders and subselects a shortlist
#[async_trait]
pub trait Reranker: Send + Sync {
    /// Return 1-based positions into `shortlist`, best first
    async fn rerank(&self, query: &str, shortlist: &[ScoredPaper], final_count: usize) -> Result<Vec<i64>>;

    /// Reranker identifier, for logs
    fn name(&self) -> &str;
}

/// Reranks by asking a chat model for a JSON array of positions
pub struct LlmReranker {
    client: Arc<dyn ChatClient>,
}

impl LlmReranker {
    pub fn new(client: Arc<dyn ChatClient>) -> Self {
        Self { client }
    }

    fn build_prompt(query: &str, shortlist: &[ScoredPaper], final_count: usize) -> String {
        let entries: Vec<String> = shortlist
            .iter()
            .enumerate()
            .map(|(i, scored)| compact_entry(i + 1, scored))
            .collect();

        format!(
            "You are helping a researcher who searched for \"{query}\".\n\
             Below are {total} candidate papers, numbered from 1.\n\
             Pick the {final_count} most relevant and useful papers, best first.\n\
             Answer with a JSON array of their numbers only, for example [3, 1, 2].\n\n\
             {entries}",
            total = shortlist.len(),
            entries = entries.join("\n"),
        )
    }
}

#[async_trait]
impl Reranker for LlmReranker {
    async fn rerank(&self, query: &str, shortlist: &[ScoredPaper], final_count: usize) -> Result<Vec<i64>> {
        let prompt = Self::build_prompt(query, shortlist, final_count);
        let reply = self.client.complete(&prompt).await?;

        parse_indices(&reply).ok_or_else(|| AppError::InvalidFormat {
            message: format!("no indices in rerank reply: {}", truncate(&reply, 80)),
        })
    }

    fn name(&self) -> &str {
        self.client.model_name()
    }
}

/// One line per paper: position, title, authors/year, citations, snippet
pub fn compact_entry(position: usize, scored: &ScoredPaper) -> String {
    let paper = &scored.paper;
    let mut line = format!(
        "{}. {} | {} | citations: {}",
        position,
        paper.title,
        paper.authors_year.as_deref().unwrap_or("unknown authors"),
        paper.citations_display(),
    );
    if let Some(snippet) = paper.snippet.as_deref().filter(|s| !s.trim().is_empty()) {
        line.push_str(" | ");
        line.push_str(&truncate(snippet.trim(), SNIPPET_CHARS));
    }
    line
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}

fn integer_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"-?\d+").expect("integer pattern is valid"))
}

/// A reply made of integers and separators only, e.g. `3, 1, 2` or `3 1 2`
fn bare_list_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^-?\d+(?:\s*,\s*-?\d+|\s+-?\d+)*\s*,?$").expect("bare list pattern is valid")
    })
}

/// Extract positions from a model reply.
///
/// The first `[...]` block is read as a JSON integer array; failing that, the
/// whole reply must be a bare comma or space separated integer list. Prose
/// that merely mentions numbers yields `None`.
pub fn parse_indices(reply: &str) -> Option<Vec<i64>> {
    if let (Some(start), Some(end)) = (reply.find('['), reply.rfind(']')) {
        if start < end {
            if let Ok(indices) = serde_json::from_str::<Vec<i64>>(&reply[start..=end]) {
                if !indices.is_empty() {
                    return Some(indices);
                }
            }
        }
    }

    let trimmed = reply.trim();
    if !bare_list_pattern().is_match(trimmed) {
        return None;
    }

    let indices: Vec<i64> = integer_pattern()
        .find_iter(trimmed)
        .filter_map(|m| m.as_str().parse().ok())
        .collect();

    if indices.is_empty() {
        None
    } else {
        Some(indices)
    }
}

/// Keep positions in `[1, shortlist_len]`, first occurrence only, at most
/// `final_count` of them; returned 0-based
pub fn valid_picks(raw: &[i64], shortlist_len: usize, final_count: usize) -> Vec<usize> {
    let mut seen = HashSet::new();
    raw.iter()
        .filter(|&&i| i >= 1 && (i as u64) <= shortlist_len as u64)
        .map(|&i| (i - 1) as usize)
        .filter(|i| seen.insert(*i))
        .take(final_count)
        .collect()
}
