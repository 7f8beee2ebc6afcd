//! Ephemeral-tab extraction.
//!
//! 1. Open the URL in a new background tab.
//! 2. Race the load listener against the timeout through one [`RaceState`].
//! 3. On load, capture the page and run the article extractor, falling back
//!    to raw page text with a warning.
//! 4. Close the tab exactly once, whatever happened.

mod summarizer;

pub use summarizer::{LinkSummarizer, Settlement};

use glance_common::bus::{topics, ExtractedLinkContent};
use glance_common::config::ExtractionConfig;
use glance_common::{Event, EventBus};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

use crate::error::ExtractionError;
use crate::race::RaceState;
use crate::readability::{self, ArticleExtractor};
use crate::tab::{TabGuard, TabHost};

const FALLBACK_WARNING: &str =
    "Readability failed to extract main content, used basic text extraction. Quality may vary.";
const UNTITLED: &str = "N/A";

/// Text pulled from a loaded page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    pub url: String,
    pub title: String,
    pub content: String,
    /// Set when the raw-text fallback was used.
    pub warning: Option<String>,
}

pub struct ExtractionPipeline {
    host: Arc<dyn TabHost>,
    extractor: Arc<dyn ArticleExtractor>,
    bus: Arc<dyn EventBus>,
    timeout: Duration,
}

impl ExtractionPipeline {
    pub fn new(
        host: Arc<dyn TabHost>,
        extractor: Arc<dyn ArticleExtractor>,
        bus: Arc<dyn EventBus>,
        config: &ExtractionConfig,
    ) -> Self {
        Self {
            host,
            extractor,
            bus,
            timeout: config.timeout(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Extract `url` and return the outcome without publishing it.
    pub async fn extract(&self, url: &str) -> Result<Extracted, ExtractionError> {
        url::Url::parse(url).map_err(|e| ExtractionError::Open(e.to_string()))?;

        let tab = self.host.open_background(url).await?;
        tracing::debug!(url = %url, tab = %tab, "Ephemeral tab opened");

        let guard = TabGuard::new(self.host.clone(), tab);
        let result = self.load_and_extract(&guard, url).await;
        guard.close().await;
        result
    }

    /// Extract `url` and publish exactly one terminal result under
    /// `correlation_id`.
    pub async fn run(&self, correlation_id: &str, url: &str) -> ExtractedLinkContent {
        let result = match self.extract(url).await {
            Ok(extracted) => {
                tracing::info!(
                    correlation_id = %correlation_id,
                    url = %url,
                    chars = extracted.content.len(),
                    fallback = extracted.warning.is_some(),
                    "Link content extracted"
                );
                ExtractedLinkContent {
                    correlation_id: correlation_id.to_string(),
                    url: extracted.url,
                    content: Some(extracted.content),
                    title: Some(extracted.title),
                    warning: extracted.warning,
                    error: None,
                }
            }
            Err(e) => {
                tracing::warn!(correlation_id = %correlation_id, url = %url, error = %e, "Link extraction failed");
                ExtractedLinkContent {
                    correlation_id: correlation_id.to_string(),
                    url: url.to_string(),
                    content: None,
                    title: None,
                    warning: None,
                    error: Some(e.to_string()),
                }
            }
        };

        let event = Event::new(topics::EXTRACTED_LINK_CONTENT, "extract-pipeline")
            .with_correlation_id(correlation_id)
            .with_payload(&result);
        match event {
            Ok(event) => {
                if let Err(e) = self.bus.publish(event).await {
                    tracing::error!(correlation_id = %correlation_id, error = %e, "Failed to publish extraction result");
                }
            }
            Err(e) => {
                tracing::error!(correlation_id = %correlation_id, error = %e, "Failed to encode extraction result")
            }
        }

        result
    }

    async fn load_and_extract(
        &self,
        guard: &TabGuard,
        url: &str,
    ) -> Result<Extracted, ExtractionError> {
        let race = Arc::new(RaceState::new());
        let (tx, mut rx) = oneshot::channel();

        let listener = {
            let host = self.host.clone();
            let tab = guard.id().clone();
            let race = race.clone();
            tokio::spawn(async move {
                let loaded = host.wait_for_load(&tab).await;
                if race.complete() {
                    let _ = tx.send(loaded);
                }
            })
        };

        let loaded = tokio::select! {
            loaded = &mut rx => loaded.unwrap_or(Err(ExtractionError::TabClosed)),
            _ = tokio::time::sleep(self.timeout) => {
                if race.time_out() {
                    listener.abort();
                    tracing::warn!(url = %url, timeout_secs = self.timeout.as_secs(), "Page load timed out");
                    return Err(ExtractionError::Timeout { url: url.to_string() });
                }
                // The listener settled first; its result is on the way.
                (&mut rx).await.unwrap_or(Err(ExtractionError::TabClosed))
            }
        };
        loaded?;

        let page = self.host.snapshot(guard.id()).await?;
        let final_url = if page.url.is_empty() {
            url.to_string()
        } else {
            page.url.clone()
        };

        if let Some(article) = self.extractor.extract(&page)?.filter(|a| !a.text.trim().is_empty()) {
            return Ok(Extracted {
                url: final_url,
                title: article.title.unwrap_or_else(|| fallback_title(&page.title)),
                content: article.text,
                warning: None,
            });
        }

        match readability::raw_text(&page) {
            Some(text) => Ok(Extracted {
                url: final_url,
                title: fallback_title(&page.title),
                content: text,
                warning: Some(FALLBACK_WARNING.to_string()),
            }),
            None => Err(ExtractionError::NoContent { url: final_url }),
        }
    }
}

fn fallback_title(title: &str) -> String {
    match title.trim() {
        "" => UNTITLED.to_string(),
        t => t.to_string(),
    }
}
