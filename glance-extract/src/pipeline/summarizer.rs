//! Turns `summarizeLinkTarget` requests into sidebar events.

use glance_common::bus::{
    topics, ExtractedLinkContent, LinkSummarizationStarted, LinkSummaryError,
    SummarizeExternalText, SummarizeLinkRequest,
};
use glance_common::{BusResult, Event, EventBus};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::ExtractionPipeline;

const SOURCE: &str = "link-summarizer";
const SETTLED_MEMORY: usize = 64;

#[derive(Debug, Clone)]
struct PendingLink {
    url: String,
    title: String,
}

/// What happened to an incoming extraction result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// Matched a pending request and was forwarded to the sidebar.
    Delivered,
    /// No request with this correlation id was ever started.
    Orphan,
    /// The request was already settled by an earlier result.
    Duplicate,
}

/// Worker-side orchestration of link summaries.
pub struct LinkSummarizer {
    pipeline: Arc<ExtractionPipeline>,
    bus: Arc<dyn EventBus>,
    pending: Mutex<HashMap<String, PendingLink>>,
    settled: Mutex<VecDeque<String>>,
}

impl LinkSummarizer {
    pub fn new(pipeline: Arc<ExtractionPipeline>, bus: Arc<dyn EventBus>) -> Self {
        Self {
            pipeline,
            bus,
            pending: Mutex::new(HashMap::new()),
            settled: Mutex::new(VecDeque::new()),
        }
    }

    /// Serve requests until the bus closes.
    pub async fn run(self: Arc<Self>) -> BusResult<()> {
        let mut requests = self.bus.subscribe(topics::SUMMARIZE_LINK_TARGET).await?;
        let mut results = self.bus.subscribe(topics::EXTRACTED_LINK_CONTENT).await?;
        tracing::info!("Link summarizer started");

        loop {
            tokio::select! {
                event = requests.recv() => {
                    let Some(event) = event else { break };
                    match event.decode::<SummarizeLinkRequest>() {
                        Ok(request) => {
                            if let Err(e) = self.start(request).await {
                                tracing::error!(error = %e, "Failed to start link summary");
                            }
                        }
                        Err(e) => tracing::warn!(error = %e, "Ignoring malformed summarize request"),
                    }
                }
                event = results.recv() => {
                    let Some(event) = event else { break };
                    match event.decode::<ExtractedLinkContent>() {
                        Ok(result) => {
                            if let Err(e) = self.settle(result).await {
                                tracing::error!(error = %e, "Failed to forward link summary");
                            }
                        }
                        Err(e) => tracing::warn!(error = %e, "Ignoring malformed extraction result"),
                    }
                }
            }
        }

        tracing::info!("Link summarizer stopped");
        Ok(())
    }

    /// Announce the request and spawn its extraction. Returns the
    /// correlation id the result will carry.
    pub async fn start(&self, request: SummarizeLinkRequest) -> BusResult<String> {
        let title = request
            .link_text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(request.url.as_str())
            .to_string();
        let correlation_id = Uuid::new_v4().to_string();

        self.pending.lock().await.insert(
            correlation_id.clone(),
            PendingLink {
                url: request.url.clone(),
                title: title.clone(),
            },
        );

        self.publish(
            topics::LINK_SUMMARIZATION_STARTED,
            &correlation_id,
            LinkSummarizationStarted {
                url: request.url.clone(),
                title,
            },
        )
        .await?;

        tracing::info!(correlation_id = %correlation_id, url = %request.url, "Link summary started");

        let pipeline = self.pipeline.clone();
        let id = correlation_id.clone();
        tokio::spawn(async move {
            pipeline.run(&id, &request.url).await;
        });

        Ok(correlation_id)
    }

    /// Forward one extraction result to the sidebar.
    pub async fn settle(&self, result: ExtractedLinkContent) -> BusResult<Settlement> {
        let id = result.correlation_id.clone();
        let pending = self.pending.lock().await.remove(&id);
        let Some(link) = pending else {
            let duplicate = self.settled.lock().await.contains(&id);
            if duplicate {
                tracing::warn!(correlation_id = %id, "Duplicate extraction result dropped");
                return Ok(Settlement::Duplicate);
            }
            tracing::warn!(correlation_id = %id, url = %result.url, "Orphan extraction result");
            return Ok(Settlement::Orphan);
        };

        {
            let mut settled = self.settled.lock().await;
            settled.push_back(id.clone());
            if settled.len() > SETTLED_MEMORY {
                settled.pop_front();
            }
        }

        match (result.content, result.error) {
            (Some(text), None) => {
                self.publish(
                    topics::SUMMARIZE_EXTERNAL_TEXT,
                    &id,
                    SummarizeExternalText {
                        text,
                        url: link.url,
                        title: link.title,
                        warning: result.warning,
                    },
                )
                .await?
            }
            (_, error) => {
                self.publish(
                    topics::SHOW_LINK_SUMMARY_ERROR,
                    &id,
                    LinkSummaryError {
                        message: error.unwrap_or_else(|| "No content extracted".to_string()),
                        url: link.url,
                        title: link.title,
                    },
                )
                .await?
            }
        }

        Ok(Settlement::Delivered)
    }

    async fn publish(&self, topic: &str, correlation_id: &str, payload: impl Serialize) -> BusResult<()> {
        let event = Event::new(topic, SOURCE)
            .with_correlation_id(correlation_id)
            .with_payload(payload)?;
        self.bus.publish(event).await
    }
}
