//! Link-summary events arriving from the extraction pipeline.

use glance_common::bus::{
    topics, LinkSummarizationStarted, LinkSummaryError, SummarizeExternalText,
};
use glance_common::{notices, BusResult, Event, EventBus, Message};
use std::sync::Arc;

use crate::error::SessionResult;
use crate::sync::SessionSync;

const LINK_STATUS_PREFIX: &str = "Summarizing link: [";

fn is_link_status(message: &Message) -> bool {
    message.transient && message.text().starts_with(LINK_STATUS_PREFIX)
}

/// Feeds link-summary events into a synchronizer.
pub struct SidebarInbox {
    sync: SessionSync,
    bus: Arc<dyn EventBus>,
}

impl SidebarInbox {
    pub fn new(sync: SessionSync, bus: Arc<dyn EventBus>) -> Self {
        Self { sync, bus }
    }

    /// Handle events until the bus closes.
    pub async fn run(self) -> BusResult<()> {
        let mut started = self.bus.subscribe(topics::LINK_SUMMARIZATION_STARTED).await?;
        let mut texts = self.bus.subscribe(topics::SUMMARIZE_EXTERNAL_TEXT).await?;
        let mut errors = self.bus.subscribe(topics::SHOW_LINK_SUMMARY_ERROR).await?;

        loop {
            let event = tokio::select! {
                Some(event) = started.recv() => event,
                Some(event) = texts.recv() => event,
                Some(event) = errors.recv() => event,
                else => break,
            };
            if let Err(e) = self.handle(&event).await {
                tracing::warn!(
                    topic = %event.topic,
                    correlation_id = %event.correlation_id,
                    error = %e,
                    "Failed to handle sidebar event"
                );
            }
        }

        tracing::debug!("Sidebar inbox stopped");
        Ok(())
    }

    /// Dispatch one event by topic. Undecodable payloads are logged and dropped.
    pub async fn handle(&self, event: &Event) -> SessionResult<()> {
        match event.topic.as_str() {
            topics::LINK_SUMMARIZATION_STARTED => match event.decode() {
                Ok(started) => self.on_started(started).await,
                Err(e) => {
                    drop_malformed(event, e);
                    Ok(())
                }
            },
            topics::SUMMARIZE_EXTERNAL_TEXT => match event.decode() {
                Ok(text) => self.on_text(text).await,
                Err(e) => {
                    drop_malformed(event, e);
                    Ok(())
                }
            },
            topics::SHOW_LINK_SUMMARY_ERROR => match event.decode() {
                Ok(error) => self.on_error(error).await,
                Err(e) => {
                    drop_malformed(event, e);
                    Ok(())
                }
            },
            _ => Ok(()),
        }
    }

    pub async fn on_started(&self, started: LinkSummarizationStarted) -> SessionResult<()> {
        self.sync.remove_where(is_link_status).await?;
        self.sync
            .push_status(notices::summarizing_link(&started.title))
            .await;
        Ok(())
    }

    pub async fn on_text(&self, text: SummarizeExternalText) -> SessionResult<()> {
        self.sync.remove_where(is_link_status).await?;

        let turn_lock = self.sync.begin_turn().await;
        let length = text.text.chars().count();
        let request = self
            .sync
            .user_message(notices::summary_request_link(&text.title, &text.url, length));
        let displayed_at = request.timestamp;
        self.sync.push_message(request).await?;

        if let Some(warning) = text.warning.as_deref() {
            let note = self.sync.model_message(notices::link_summary_warning(warning));
            self.sync.push_message(note).await?;
        }

        if text.text.trim().is_empty() {
            let empty = self
                .sync
                .model_message(notices::link_summary_no_text(&text.title, &text.url));
            return self.sync.push_message(empty).await;
        }

        self.sync
            .ask_summary(&turn_lock, &text.text, displayed_at)
            .await
    }

    pub async fn on_error(&self, error: LinkSummaryError) -> SessionResult<()> {
        self.sync.remove_where(is_link_status).await?;
        let failed = self
            .sync
            .model_message(notices::summarizing_link_failed(&error.title, &error.message));
        self.sync.push_message(failed).await
    }
}

fn drop_malformed(event: &Event, error: glance_common::BusError) {
    tracing::warn!(topic = %event.topic, error = %error, "Dropping malformed event");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_status_detection() {
        let status = Message::model(notices::summarizing_link("Docs"), 1).into_transient();
        assert!(is_link_status(&status));

        let durable = Message::model(notices::summarizing_link("Docs"), 2);
        assert!(!is_link_status(&durable));
        assert!(!is_link_status(&Message::model("Thinking...", 3).into_transient()));
    }
}
