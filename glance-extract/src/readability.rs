//! Main-content extraction from a captured page.

use glance_common::util::normalize_whitespace;
use scraper::{ElementRef, Html, Selector};

use crate::error::ExtractionError;
use crate::tab::PageSnapshot;

/// Candidate containers for the main article, most specific first.
const ARTICLE_SELECTORS: &[&str] = &["article", "main", "[role=main]", "#content", ".content"];

/// Elements whose text is never part of readable content.
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "svg"];

/// Minimum text length for a container to count as an article.
pub const DEFAULT_MIN_ARTICLE_CHARS: usize = 100;

/// The readable part of a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub title: Option<String>,
    pub text: String,
}

/// Finds the main article in a page.
///
/// `Ok(None)` means the page loaded but has no identifiable article; the
/// pipeline then falls back to raw page text.
pub trait ArticleExtractor: Send + Sync {
    fn extract(&self, page: &PageSnapshot) -> Result<Option<Article>, ExtractionError>;
}

/// Selector-based readability heuristic over the captured HTML.
#[derive(Debug, Clone)]
pub struct ReadabilityExtractor {
    min_chars: usize,
}

impl ReadabilityExtractor {
    pub fn new(min_chars: usize) -> Self {
        Self { min_chars }
    }
}

impl Default for ReadabilityExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_ARTICLE_CHARS)
    }
}

impl ArticleExtractor for ReadabilityExtractor {
    fn extract(&self, page: &PageSnapshot) -> Result<Option<Article>, ExtractionError> {
        let document = Html::parse_document(&page.html);

        for css in ARTICLE_SELECTORS {
            let Ok(selector) = Selector::parse(css) else {
                continue;
            };
            for element in document.select(&selector) {
                let text = visible_text(element);
                if text.chars().count() >= self.min_chars {
                    tracing::debug!(selector = css, chars = text.len(), "Article container found");
                    return Ok(Some(Article {
                        title: page_title(page, &document),
                        text,
                    }));
                }
            }
        }

        Ok(None)
    }
}

/// Text of the whole page, for when no article was found.
pub fn raw_text(page: &PageSnapshot) -> Option<String> {
    if let Some(body) = page.body_text.as_deref() {
        let text = normalize_whitespace(body);
        if !text.is_empty() {
            return Some(text);
        }
    }

    let document = Html::parse_document(&page.html);
    let selector = Selector::parse("body").ok()?;
    let text = document
        .select(&selector)
        .next()
        .map(visible_text)
        .unwrap_or_default();
    (!text.is_empty()).then_some(text)
}

/// Title reported by the host, else the document `<title>`.
pub fn page_title(page: &PageSnapshot, document: &Html) -> Option<String> {
    let reported = page.title.trim();
    if !reported.is_empty() {
        return Some(reported.to_string());
    }
    let selector = Selector::parse("title").ok()?;
    document
        .select(&selector)
        .next()
        .map(|t| t.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
}

fn visible_text(element: ElementRef<'_>) -> String {
    let mut raw = String::new();
    for node in element.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|e| HIDDEN_ELEMENTS.contains(&e.name()))
        });
        if !hidden {
            raw.push_str(text);
            raw.push(' ');
        }
    }

    let collapsed: Vec<String> = raw
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect();
    normalize_whitespace(&collapsed.join("\n"))
}
