//! Chromium tab host over the DevTools protocol.

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::target::CreateTargetParams;
use chromiumoxide::Page;
use futures::StreamExt;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::ExtractionError;
use crate::tab::{PageSnapshot, TabHost, TabId};

const BODY_TEXT_SCRIPT: &str = "document.body ? document.body.innerText : ''";

/// Headless Chromium driven by chromiumoxide.
pub struct CdpTabHost {
    browser: Browser,
    handler: JoinHandle<()>,
    pages: Mutex<HashMap<TabId, Page>>,
}

impl CdpTabHost {
    /// Launch a headless browser.
    pub async fn launch() -> Result<Self, ExtractionError> {
        let config = BrowserConfig::builder()
            .build()
            .map_err(ExtractionError::Open)?;
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ExtractionError::Open(format!("browser launch failed: {}", e)))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!(error = %e, "CDP handler error");
                }
            }
        });

        tracing::info!("Headless browser launched");
        Ok(Self {
            browser,
            handler,
            pages: Mutex::new(HashMap::new()),
        })
    }

    async fn page(&self, tab: &TabId) -> Result<Page, ExtractionError> {
        self.pages
            .lock()
            .await
            .get(tab)
            .cloned()
            .ok_or(ExtractionError::TabClosed)
    }
}

impl Drop for CdpTabHost {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

#[async_trait]
impl TabHost for CdpTabHost {
    async fn open_background(&self, url: &str) -> Result<TabId, ExtractionError> {
        let params = CreateTargetParams::builder()
            .url(url)
            .background(true)
            .build()
            .map_err(ExtractionError::Open)?;
        let page = self
            .browser
            .new_page(params)
            .await
            .map_err(|e| ExtractionError::Open(e.to_string()))?;

        let id = TabId(Uuid::new_v4().to_string());
        self.pages.lock().await.insert(id.clone(), page);
        Ok(id)
    }

    async fn wait_for_load(&self, tab: &TabId) -> Result<(), ExtractionError> {
        let page = self.page(tab).await?;
        page.wait_for_navigation()
            .await
            .map_err(|e| ExtractionError::Capture(e.to_string()))?;
        Ok(())
    }

    async fn snapshot(&self, tab: &TabId) -> Result<PageSnapshot, ExtractionError> {
        let page = self.page(tab).await?;
        let capture = |e: chromiumoxide::error::CdpError| ExtractionError::Capture(e.to_string());

        let html = page.content().await.map_err(capture)?;
        let title = page.get_title().await.map_err(capture)?.unwrap_or_default();
        let url = page.url().await.map_err(capture)?.unwrap_or_default();
        let body_text = page
            .evaluate(BODY_TEXT_SCRIPT)
            .await
            .ok()
            .and_then(|result| result.into_value::<String>().ok());

        Ok(PageSnapshot {
            url,
            title,
            html,
            body_text,
        })
    }

    async fn close(&self, tab: &TabId) -> Result<(), ExtractionError> {
        let page = self
            .pages
            .lock()
            .await
            .remove(tab)
            .ok_or(ExtractionError::TabClosed)?;
        page.close()
            .await
            .map_err(|e| ExtractionError::Capture(e.to_string()))
    }
}
