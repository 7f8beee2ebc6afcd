//! Link summaries: extract in a background tab, then summarize in the
//! current conversation.

use anyhow::{bail, Context, Result};
use glance_common::bus::{topics, ExtractedLinkContent, SummarizeLinkRequest};
use glance_common::{EventBus, InMemoryBus};
use glance_extract::{ExtractionPipeline, LinkSummarizer, ReadabilityExtractor, TabHost};
use glance_session::SidebarInbox;
use std::sync::Arc;

use crate::app::App;
use crate::output::print_messages_from;

#[cfg(feature = "cdp")]
pub async fn run(app: &App, url: String, title: Option<String>) -> Result<()> {
    let host = glance_extract::CdpTabHost::launch().await.map_err(|e| {
        glance_common::Error::from(e).with_context("Failed to start the headless browser")
    })?;
    summarize_with(app, Arc::new(host), url, title).await
}

#[cfg(not(feature = "cdp"))]
pub async fn run(_app: &App, url: String, _title: Option<String>) -> Result<()> {
    bail!(
        "No tab host is available to open {}; rebuild glance-cli with `--features cdp`",
        url
    )
}

/// Run one link summary end to end through the bus.
#[cfg_attr(not(feature = "cdp"), allow(dead_code))]
pub async fn summarize_with(
    app: &App,
    host: Arc<dyn TabHost>,
    url: String,
    title: Option<String>,
) -> Result<()> {
    let sync = app.sync().await?;
    let before = sync.active().await.len();

    let bus = Arc::new(InMemoryBus::new());
    let pipeline = ExtractionPipeline::new(
        host,
        Arc::new(ReadabilityExtractor::new(app.config.extraction.min_article_chars)),
        bus.clone(),
        &app.config.extraction,
    );
    let summarizer = LinkSummarizer::new(Arc::new(pipeline), bus.clone());
    let inbox = SidebarInbox::new(sync.clone(), bus.clone());

    let mut started = bus.subscribe(topics::LINK_SUMMARIZATION_STARTED).await?;
    let mut results = bus.subscribe(topics::EXTRACTED_LINK_CONTENT).await?;
    let mut texts = bus.subscribe(topics::SUMMARIZE_EXTERNAL_TEXT).await?;
    let mut errors = bus.subscribe(topics::SHOW_LINK_SUMMARY_ERROR).await?;

    let id = summarizer
        .start(SummarizeLinkRequest {
            url,
            link_text: title,
        })
        .await?;

    if let Some(event) = started.recv().await {
        inbox.handle(&event).await?;
    }

    let result = loop {
        let event = results.recv().await.context("Message bus closed")?;
        let result: ExtractedLinkContent = event.decode()?;
        if result.correlation_id == id {
            break result;
        }
    };
    summarizer.settle(result).await?;

    let event = tokio::select! {
        Some(event) = texts.recv() => event,
        Some(event) = errors.recv() => event,
        else => bail!("Message bus closed"),
    };
    inbox.handle(&event).await?;

    print_messages_from(&sync.active().await.messages, before);
    Ok(())
}
