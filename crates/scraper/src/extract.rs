//! Result-page field extraction
//!
//! One `PaperRecord` per `.gs_r` result block. Missing fields stay `None`; a
//! missing title becomes the `"No title"` sentinel.

use crate::errors::ScrapeError;
use regex_lite::Regex;
use reqwest::Url;
use scholarrank_common::PaperRecord;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;

/// Phrases that only appear on interstitial "are you a robot" pages
const BLOCK_MARKERS: &[&str] = &[
    "unusual traffic from your computer network",
    "please show you're not a robot",
    "not a robot",
    "/sorry/index",
];

/// Records extracted from one result page
#[derive(Debug, Default)]
pub struct ParsedPage {
    pub records: Vec<PaperRecord>,
    pub blocked: bool,
}

struct Selectors {
    result: Selector,
    body: Selector,
    heading: Selector,
    heading_link: Selector,
    snippet: Selector,
    authors: Selector,
    footer_links: Selector,
    pdf_link: Selector,
    captcha: Selector,
}

fn selector(css: &str) -> Result<Selector, ScrapeError> {
    Selector::parse(css).map_err(|e| ScrapeError::Selector {
        selector: css.to_string(),
        message: e.to_string(),
    })
}

impl Selectors {
    fn new() -> Result<Self, ScrapeError> {
        Ok(Self {
            result: selector("div.gs_r")?,
            body: selector(".gs_ri")?,
            heading: selector("h3")?,
            heading_link: selector("h3 a")?,
            snippet: selector(".gs_rs")?,
            authors: selector(".gs_a")?,
            footer_links: selector(".gs_fl a")?,
            pdf_link: selector(".gs_or_ggsm a")?,
            captcha: selector("#gs_captcha_ccl, #captcha-form, #recaptcha")?,
        })
    }
}

fn cited_by_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"Cited by\s+(\d+)").expect("cited-by pattern is valid"))
}

fn marker_prefix_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(\s*\[[^\]]*\])+\s*").expect("marker pattern is valid"))
}

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().split_whitespace().collect::<Vec<_>>().join(" ")
}

fn non_empty(text: String) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Resolve `href` against the page URL; absolute links pass through
fn absolute(base: &Url, href: &str) -> Option<String> {
    base.join(href).ok().map(|u| u.to_string())
}

/// Parse one result page. `page_url` resolves relative links.
pub fn parse_results(html: &str, page_url: &str) -> Result<ParsedPage, ScrapeError> {
    let base = Url::parse(page_url).map_err(|e| ScrapeError::Url {
        url: page_url.to_string(),
        message: e.to_string(),
    })?;
    let selectors = Selectors::new()?;
    let document = Html::parse_document(html);

    let records: Vec<PaperRecord> = document
        .select(&selectors.result)
        .filter_map(|block| {
            let body = block.select(&selectors.body).next()?;
            Some(parse_entry(block, body, &selectors, &base))
        })
        .collect();

    let blocked = records.is_empty() && is_blocked(&document, html, &selectors);

    Ok(ParsedPage { records, blocked })
}

fn is_blocked(document: &Html, html: &str, selectors: &Selectors) -> bool {
    if document.select(&selectors.captcha).next().is_some() {
        return true;
    }
    let lowered = html.to_lowercase();
    BLOCK_MARKERS.iter().any(|marker| lowered.contains(marker))
}

fn parse_entry(block: ElementRef<'_>, body: ElementRef<'_>, selectors: &Selectors, base: &Url) -> PaperRecord {
    let link = body.select(&selectors.heading_link).next();

    let title = match link {
        Some(anchor) => non_empty(text_of(anchor)),
        None => body.select(&selectors.heading).next().and_then(|h| {
            let text = text_of(h);
            non_empty(marker_prefix_pattern().replace(&text, "").trim().to_string())
        }),
    };

    let mut paper = PaperRecord::from_extracted_title(title);

    if let Some(href) = link.and_then(|a| a.value().attr("href")) {
        if let Some(url) = absolute(base, href) {
            paper = paper.with_primary_link(url);
        }
    }

    if let Some(snippet) = body.select(&selectors.snippet).next().map(text_of).and_then(non_empty) {
        paper = paper.with_snippet(snippet);
    }

    if let Some(authors) = body.select(&selectors.authors).next().map(text_of).and_then(non_empty) {
        paper = paper.with_authors_year(authors);
    }

    for anchor in body.select(&selectors.footer_links) {
        let text = text_of(anchor);
        if let Some(count) = cited_by_pattern()
            .captures(&text)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<u64>().ok())
        {
            paper = paper.with_citations(count);
        } else if text.starts_with("All ") && text.contains("version") {
            if let Some(url) = anchor.value().attr("href").and_then(|h| absolute(base, h)) {
                paper = paper.with_stable_link(url);
            }
        }
    }

    if let Some(url) = block
        .select(&selectors.pdf_link)
        .next()
        .and_then(|a| a.value().attr("href"))
        .and_then(|h| absolute(base, h))
    {
        paper = paper.with_pdf_link(url);
    }

    paper
}

#[cfg(test)]
mod tests {
    use super::*;
    use scholarrank_common::NO_TITLE;

    const PAGE_URL: &str = "https://scholar.google.com/scholar?q=bayesian+regression";

    const RESULTS: &str = r#"
<html><body><div id="gs_res_ccl_mid">
  <div class="gs_r gs_or gs_scl" data-cid="c1">
    <div class="gs_ggs gs_fl"><div class="gs_ggsd"><div class="gs_or_ggsm">
      <a href="https://arxiv.org/pdf/2001.00001.pdf"><span class="gs_ctg2">[PDF]</span> arxiv.org</a>
    </div></div></div>
    <div class="gs_ri">
      <h3 class="gs_rt"><a href="https://example.org/bayes">Bayesian <b>regression</b> basics</a></h3>
      <div class="gs_a">A Smith, B Jones - Journal of Statistics, 2020 - example.org</div>
      <div class="gs_rs">We review   Bayesian linear
        regression.</div>
      <div class="gs_fl gs_flb">
        <a href="/scholar?cites=111&amp;hl=en">Cited by 50</a>
        <a href="/scholar?q=related:c1">Related articles</a>
        <a href="/scholar?cluster=111&amp;hl=en">All 7 versions</a>
      </div>
    </div>
  </div>
  <div class="gs_r gs_or gs_scl" data-cid="c2">
    <div class="gs_ri">
      <h3 class="gs_rt"><span class="gs_ctu"><span class="gs_ct1">[CITATION]</span><span class="gs_ct2">[C]</span></span> Unlinked regression notes</h3>
      <div class="gs_a">C Doe - 1998</div>
    </div>
  </div>
  <div class="gs_r gs_or gs_scl" data-cid="c3">
    <div class="gs_ri">
      <div class="gs_rs">Only a snippet survives here.</div>
    </div>
  </div>
  <div class="gs_r gs_scl">
    <div class="gs_fl">not a result body</div>
  </div>
</div></body></html>
"#;

    #[test]
    fn test_parse_full_entry() {
        let page = parse_results(RESULTS, PAGE_URL).unwrap();
        assert!(!page.blocked);
        assert_eq!(page.records.len(), 3);

        let first = &page.records[0];
        assert_eq!(first.title, "Bayesian regression basics");
        assert_eq!(first.primary_link.as_deref(), Some("https://example.org/bayes"));
        assert_eq!(first.snippet.as_deref(), Some("We review Bayesian linear regression."));
        assert_eq!(
            first.authors_year.as_deref(),
            Some("A Smith, B Jones - Journal of Statistics, 2020 - example.org")
        );
        assert_eq!(first.year, Some(2020));
        assert_eq!(first.citation_count, Some(50));
        assert_eq!(
            first.stable_link.as_deref(),
            Some("https://scholar.google.com/scholar?cluster=111&hl=en")
        );
        assert_eq!(first.pdf_link.as_deref(), Some("https://arxiv.org/pdf/2001.00001.pdf"));
        assert_eq!(first.best_link(), first.pdf_link.as_deref());
    }

    #[test]
    fn test_parse_partial_entries() {
        let page = parse_results(RESULTS, PAGE_URL).unwrap();

        let citation_only = &page.records[1];
        assert_eq!(citation_only.title, "Unlinked regression notes");
        assert_eq!(citation_only.primary_link, None);
        assert_eq!(citation_only.citation_count, None);
        assert_eq!(citation_only.year, Some(1998));

        let bare = &page.records[2];
        assert_eq!(bare.title, NO_TITLE);
        assert_eq!(bare.snippet.as_deref(), Some("Only a snippet survives here."));
        assert_eq!(bare.authors_year, None);
        assert_eq!(bare.year, None);
    }

    #[test]
    fn test_detect_captcha_page() {
        let html = r#"<html><body><form id="captcha-form" action="/sorry/index">
            <p>Our systems have detected unusual traffic from your computer network.</p>
        </form></body></html>"#;
        let page = parse_results(html, PAGE_URL).unwrap();
        assert!(page.records.is_empty());
        assert!(page.blocked);
    }

    #[test]
    fn test_empty_results_page_is_not_blocked() {
        let html = "<html><body><div id=\"gs_res_ccl_mid\"></div>Your search did not match any articles.</body></html>";
        let page = parse_results(html, PAGE_URL).unwrap();
        assert!(page.records.is_empty());
        assert!(!page.blocked);
    }

    #[test]
    fn test_bad_page_url() {
        assert!(matches!(parse_results(RESULTS, "not a url"), Err(ScrapeError::Url { .. })));
    }
}
