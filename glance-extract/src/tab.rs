//! Browser tabs the pipeline borrows.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::ExtractionError;

/// Opaque handle to a tab owned by a [`TabHost`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TabId(pub String);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything the extractor needs from a loaded page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSnapshot {
    /// Final document URL after redirects.
    pub url: String,
    pub title: String,
    pub html: String,
    /// Rendered text of `<body>`, if the host can provide it.
    pub body_text: Option<String>,
}

/// A browser that can open, observe and close tabs.
#[async_trait]
pub trait TabHost: Send + Sync {
    /// Open `url` in a new inactive tab.
    async fn open_background(&self, url: &str) -> Result<TabId, ExtractionError>;

    /// Resolve once navigation completes. May never resolve.
    async fn wait_for_load(&self, tab: &TabId) -> Result<(), ExtractionError>;

    async fn snapshot(&self, tab: &TabId) -> Result<PageSnapshot, ExtractionError>;

    async fn close(&self, tab: &TabId) -> Result<(), ExtractionError>;
}

/// Sole owner of an ephemeral tab.
///
/// The tab is closed at most once: by the first [`TabGuard::close`] call, or
/// by a close scheduled from `Drop` if no path closed it.
pub struct TabGuard {
    host: Arc<dyn TabHost>,
    tab: TabId,
    closed: AtomicBool,
}

impl TabGuard {
    pub fn new(host: Arc<dyn TabHost>, tab: TabId) -> Self {
        Self {
            host,
            tab,
            closed: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> &TabId {
        &self.tab
    }

    /// Close the tab. Returns `false` if it was already closed.
    pub async fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        if let Err(e) = self.host.close(&self.tab).await {
            // The tab may already be gone; nothing else to release.
            tracing::debug!(tab = %self.tab, error = %e, "Tab close reported an error");
        }
        tracing::debug!(tab = %self.tab, "Ephemeral tab closed");
        true
    }
}

impl Drop for TabGuard {
    fn drop(&mut self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let host = self.host.clone();
                let tab = self.tab.clone();
                handle.spawn(async move {
                    if let Err(e) = host.close(&tab).await {
                        tracing::debug!(tab = %tab, error = %e, "Deferred tab close failed");
                    }
                });
            }
            Err(_) => {
                tracing::warn!(tab = %self.tab, "Tab guard dropped outside a runtime; tab left open");
            }
        }
    }
}
