//! Paper record model
//!
//! A `PaperRecord` is one publication as discovered on a scholarly search
//! results page. Records are plain values: they have no identity beyond
//! structural equality and are never mutated once the extraction layer
//! hands them over.

use chrono::Datelike;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Title substituted when extraction fails to find one
pub const NO_TITLE: &str = "No title";

/// Earliest publication year considered plausible
pub const MIN_YEAR: i32 = 1900;

fn default_title() -> String {
    NO_TITLE.to_string()
}

/// One discovered publication
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperRecord {
    /// Paper title (`"No title"` when extraction failed)
    #[serde(default = "default_title")]
    pub title: String,

    /// Link attached to the result title
    #[serde(default, alias = "link")]
    pub primary_link: Option<String>,

    /// Stable link on the search engine itself (cluster/versions page)
    #[serde(default, alias = "scholar_link")]
    pub stable_link: Option<String>,

    /// Direct full-text link
    #[serde(default)]
    pub pdf_link: Option<String>,

    /// Text excerpt shown under the title
    #[serde(default)]
    pub snippet: Option<String>,

    /// Free text combining author list, venue and year
    #[serde(default)]
    pub authors_year: Option<String>,

    /// Citation count; `None` means unknown, not zero
    #[serde(default, alias = "citations")]
    pub citation_count: Option<u64>,

    /// Publication year in `[1900, current_year]`
    #[serde(default)]
    pub year: Option<i32>,
}

impl Default for PaperRecord {
    fn default() -> Self {
        Self {
            title: default_title(),
            primary_link: None,
            stable_link: None,
            pdf_link: None,
            snippet: None,
            authors_year: None,
            citation_count: None,
            year: None,
        }
    }
}

impl PaperRecord {
    /// Create a record with only a title
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Create a record from an optionally extracted title, substituting the
    /// sentinel when the title is missing or blank
    pub fn from_extracted_title(title: Option<String>) -> Self {
        let title = title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(default_title);
        Self::new(title)
    }

    pub fn with_primary_link(mut self, link: impl Into<String>) -> Self {
        self.primary_link = Some(link.into());
        self
    }

    pub fn with_stable_link(mut self, link: impl Into<String>) -> Self {
        self.stable_link = Some(link.into());
        self
    }

    pub fn with_pdf_link(mut self, link: impl Into<String>) -> Self {
        self.pdf_link = Some(link.into());
        self
    }

    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = Some(snippet.into());
        self
    }

    /// Attach the authors/year line; also derives `year` when not yet set
    pub fn with_authors_year(mut self, authors_year: impl Into<String>) -> Self {
        let authors_year = authors_year.into();
        if self.year.is_none() {
            self.year = extract_year(&authors_year);
        }
        self.authors_year = Some(authors_year);
        self
    }

    pub fn with_citations(mut self, count: u64) -> Self {
        self.citation_count = Some(count);
        self
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    /// Whether the title is a real extracted title (not blank, not the sentinel)
    pub fn has_title(&self) -> bool {
        let title = self.title.trim();
        !title.is_empty() && title != NO_TITLE
    }

    /// Most authoritative link: PDF, then stable link, then primary link
    pub fn best_link(&self) -> Option<&str> {
        self.pdf_link
            .as_deref()
            .or(self.stable_link.as_deref())
            .or(self.primary_link.as_deref())
    }

    /// Citation count for display; unknown counts are not shown as zero
    pub fn citations_display(&self) -> String {
        match self.citation_count {
            Some(count) => count.to_string(),
            None => "unknown".to_string(),
        }
    }
}

/// Current calendar year (UTC)
pub fn current_year() -> i32 {
    chrono::Utc::now().year()
}

fn year_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\b(?:19|20)\d{2}\b").expect("year pattern is valid"))
}

/// Extract a publication year from free text.
///
/// The first `19xx`/`20xx` token wins; it is rejected when it lies after the
/// current year.
pub fn extract_year(text: &str) -> Option<i32> {
    let found = year_pattern().find(text)?;
    let year: i32 = found.as_str().parse().ok()?;

    if (MIN_YEAR..=current_year()).contains(&year) {
        Some(year)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_year_first_match_wins() {
        let text = "AB Smith, C Jones - Journal of Statistics, 2019 - Springer (reprinted 2021)";
        assert_eq!(extract_year(text), Some(2019));
    }

    #[test]
    fn test_extract_year_ignores_non_year_numbers() {
        assert_eq!(extract_year("vol 12345, pp. 1800-1830"), None);
        assert_eq!(extract_year(""), None);
    }

    #[test]
    fn test_extract_year_rejects_future() {
        assert_eq!(extract_year("Preprint - 2099 - arxiv.org"), None);
    }

    #[test]
    fn test_best_link_precedence() {
        let paper = PaperRecord::new("A")
            .with_primary_link("https://publisher.example/a")
            .with_stable_link("https://scholar.example/cluster?a");
        assert_eq!(paper.best_link(), Some("https://scholar.example/cluster?a"));

        let paper = paper.with_pdf_link("https://arxiv.example/a.pdf");
        assert_eq!(paper.best_link(), Some("https://arxiv.example/a.pdf"));

        assert_eq!(PaperRecord::new("B").best_link(), None);
    }

    #[test]
    fn test_title_sentinel() {
        assert_eq!(PaperRecord::from_extracted_title(None).title, NO_TITLE);
        assert_eq!(PaperRecord::from_extracted_title(Some("  ".into())).title, NO_TITLE);
        assert!(!PaperRecord::from_extracted_title(None).has_title());
        assert!(PaperRecord::new("Gaussian Processes").has_title());
    }

    #[test]
    fn test_authors_year_derives_year() {
        let paper = PaperRecord::new("X").with_authors_year("CM Bishop - 2006 - Springer");
        assert_eq!(paper.year, Some(2006));

        // An explicit year is not overwritten
        let paper = PaperRecord::new("X")
            .with_year(2010)
            .with_authors_year("CM Bishop - 2006 - Springer");
        assert_eq!(paper.year, Some(2010));
    }

    #[test]
    fn test_unknown_citations_display() {
        assert_eq!(PaperRecord::new("X").citations_display(), "unknown");
        assert_eq!(PaperRecord::new("X").with_citations(0).citations_display(), "0");
    }

    #[test]
    fn test_deserialize_with_aliases() {
        let json = r#"{"title":"Bayesian Regression Basics","citations":50,"year":2020,"link":"https://x.example"}"#;
        let paper: PaperRecord = serde_json::from_str(json).unwrap();
        assert_eq!(paper.citation_count, Some(50));
        assert_eq!(paper.primary_link.as_deref(), Some("https://x.example"));

        let paper: PaperRecord = serde_json::from_str("{}").unwrap();
        assert_eq!(paper.title, NO_TITLE);
    }
}
