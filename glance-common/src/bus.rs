//! Message bus between execution contexts.
//!
//! Contexts (sidebar, background worker, archive page) never share memory.
//! They exchange best-effort events through an [`EventBus`]; every event
//! carries a correlation id so request/response pairs can be matched.
//!
//! # Topics
//!
//! | Topic | Direction | Payload |
//! |-------|-----------|---------|
//! | `summarizeLinkTarget` | sidebar → worker | [`SummarizeLinkRequest`] |
//! | `LINK_SUMMARIZATION_STARTED` | worker → sidebar | [`LinkSummarizationStarted`] |
//! | `SUMMARIZE_EXTERNAL_TEXT_FOR_SIDEBAR` | worker → sidebar | [`SummarizeExternalText`] |
//! | `SHOW_LINK_SUMMARY_ERROR` | worker → sidebar | [`LinkSummaryError`] |
//! | `extractedLinkContent` | pipeline → worker | [`ExtractedLinkContent`] |

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

/// Well-known topic names.
pub mod topics {
    pub const SUMMARIZE_LINK_TARGET: &str = "summarizeLinkTarget";
    pub const LINK_SUMMARIZATION_STARTED: &str = "LINK_SUMMARIZATION_STARTED";
    pub const SUMMARIZE_EXTERNAL_TEXT: &str = "SUMMARIZE_EXTERNAL_TEXT_FOR_SIDEBAR";
    pub const SHOW_LINK_SUMMARY_ERROR: &str = "SHOW_LINK_SUMMARY_ERROR";
    pub const EXTRACTED_LINK_CONTENT: &str = "extractedLinkContent";
}

// ============================================================================
// Error Types
// ============================================================================

/// Event bus errors.
#[derive(Error, Debug)]
pub enum BusError {
    /// Subscription error.
    #[error("Subscription error: {0}")]
    Subscription(String),

    /// Publish error.
    #[error("Publish error: {0}")]
    Publish(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The bus was closed.
    #[error("Bus closed")]
    Closed,
}

/// Result type for bus operations.
pub type BusResult<T> = Result<T, BusError>;

// ============================================================================
// Event Types
// ============================================================================

/// Event envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique event ID.
    pub id: String,
    /// Topic name.
    pub topic: String,
    /// Context that published the event (e.g. "sidebar", "worker").
    pub source: String,
    /// Correlation ID for request/response tracking.
    pub correlation_id: String,
    /// Event timestamp.
    pub timestamp: DateTime<Utc>,
    /// JSON payload.
    pub payload: serde_json::Value,
}

impl Event {
    /// Create a new event with a fresh id and correlation id.
    pub fn new(topic: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            topic: topic.into(),
            source: source.into(),
            correlation_id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            payload: serde_json::Value::Null,
        }
    }

    /// Set the payload.
    pub fn with_payload(mut self, payload: impl Serialize) -> BusResult<Self> {
        self.payload =
            serde_json::to_value(payload).map_err(|e| BusError::Serialization(e.to_string()))?;
        Ok(self)
    }

    /// Set the correlation ID.
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = correlation_id.into();
        self
    }

    /// Decode the payload into a typed struct.
    pub fn decode<T: DeserializeOwned>(&self) -> BusResult<T> {
        serde_json::from_value(self.payload.clone())
            .map_err(|e| BusError::Serialization(format!("{}: {}", self.topic, e)))
    }
}

// ============================================================================
// Payloads
// ============================================================================

/// Ask the worker to summarize a link target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarizeLinkRequest {
    pub url: String,
    pub link_text: Option<String>,
}

/// The worker accepted a link and started extracting it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkSummarizationStarted {
    pub url: String,
    pub title: String,
}

/// Extracted text ready to be summarized in the sidebar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummarizeExternalText {
    pub text: String,
    pub url: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Link extraction failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkSummaryError {
    pub message: String,
    pub url: String,
    pub title: String,
}

/// Terminal result of one extraction run.
///
/// Exactly one of `content` / `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedLinkContent {
    pub correlation_id: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExtractedLinkContent {
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.content.is_some()
    }
}

// ============================================================================
// Event Bus Trait
// ============================================================================

/// Trait for event bus implementations.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publish an event to its topic. Delivery is best-effort.
    async fn publish(&self, event: Event) -> BusResult<()>;

    /// Subscribe to a topic.
    async fn subscribe(&self, topic: &str) -> BusResult<EventReceiver>;

    /// Close the bus; existing receivers drain and then end.
    async fn close(&self) -> BusResult<()>;
}

/// Event receiver for subscriptions.
pub struct EventReceiver {
    inner: broadcast::Receiver<Event>,
}

impl EventReceiver {
    /// Receive the next event, skipping over lag gaps.
    ///
    /// Returns `None` once the bus is closed.
    pub async fn recv(&mut self) -> Option<Event> {
        loop {
            match self.inner.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event receiver lagged; events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

// ============================================================================
// In-Memory Event Bus
// ============================================================================

/// In-process event bus backed by tokio broadcast channels.
#[derive(Clone)]
pub struct InMemoryBus {
    topics: Arc<RwLock<HashMap<String, broadcast::Sender<Event>>>>,
    capacity: usize,
}

impl InMemoryBus {
    /// Create a new in-memory bus with default capacity.
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    /// Create a new in-memory bus with specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            topics: Arc::new(RwLock::new(HashMap::new())),
            capacity,
        }
    }

    async fn get_or_create_topic(&self, topic: &str) -> broadcast::Sender<Event> {
        let mut topics = self.topics.write().await;
        topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }
}

impl Default for InMemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventBus for InMemoryBus {
    async fn publish(&self, event: Event) -> BusResult<()> {
        let sender = self.get_or_create_topic(&event.topic).await;

        tracing::debug!(
            topic = %event.topic,
            correlation_id = %event.correlation_id,
            source = %event.source,
            "Event published"
        );

        // No receivers is not an error: delivery is best-effort.
        let _ = sender.send(event);
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> BusResult<EventReceiver> {
        let sender = self.get_or_create_topic(topic).await;
        tracing::debug!(topic = %topic, "Subscribed to topic");
        Ok(EventReceiver {
            inner: sender.subscribe(),
        })
    }

    async fn close(&self) -> BusResult<()> {
        self.topics.write().await.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_builder() {
        let event = Event::new(topics::LINK_SUMMARIZATION_STARTED, "worker")
            .with_correlation_id("abc")
            .with_payload(LinkSummarizationStarted {
                url: "https://example.com".into(),
                title: "Example".into(),
            })
            .unwrap();

        assert_eq!(event.correlation_id, "abc");
        assert_eq!(event.payload["title"], "Example");
        let decoded: LinkSummarizationStarted = event.decode().unwrap();
        assert_eq!(decoded.url, "https://example.com");
    }

    #[test]
    fn test_extracted_content_wire_shape() {
        let result = ExtractedLinkContent {
            correlation_id: "c1".into(),
            url: "https://a.test".into(),
            content: None,
            title: None,
            warning: None,
            error: Some("Timeout".into()),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["correlationId"], "c1");
        assert!(json.get("content").is_none());
        assert!(!result.is_success());
    }

    #[tokio::test]
    async fn test_publish_subscribe() {
        let bus = InMemoryBus::new();
        let mut rx = bus.subscribe(topics::EXTRACTED_LINK_CONTENT).await.unwrap();

        let event = Event::new(topics::EXTRACTED_LINK_CONTENT, "pipeline");
        let id = event.id.clone();
        bus.publish(event).await.unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.id, id);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_ok() {
        let bus = InMemoryBus::new();
        let result = bus.publish(Event::new("nobody", "test")).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_close_ends_receivers() {
        let bus = InMemoryBus::new();
        let mut rx = bus.subscribe("t").await.unwrap();
        bus.close().await.unwrap();
        assert!(rx.recv().await.is_none());
    }
}
