//! End-to-end chat turn: prepare, build, send, parse.

use glance_common::util::sanitize_for_log;
use glance_common::{notices, Clock, Message, ProviderConfig};
use std::sync::Arc;

use crate::error::ChatError;
use crate::image::{encode_image, ImageFetcher};
use crate::transport::{ChatTransport, WireRequest};
use crate::window::history_window;
use crate::wire::{self, PreparedTurn};

/// What the user is sending now.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTurn {
    pub text: Option<String>,
    /// URL or data URI of an attached image.
    pub image: Option<String>,
    /// Timestamp of the message that displays this turn, if one was appended.
    pub timestamp: Option<i64>,
}

impl NewTurn {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn with_image(mut self, locator: impl Into<String>) -> Self {
        self.image = Some(locator.into());
        self
    }

    pub fn displayed_at(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    fn trimmed_text(&self) -> Option<&str> {
        self.text.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }
}

/// Sends turns to whichever provider a configuration names.
pub struct ChatClient {
    transport: Arc<dyn ChatTransport>,
    images: Arc<dyn ImageFetcher>,
    clock: Arc<dyn Clock>,
}

impl ChatClient {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        images: Arc<dyn ImageFetcher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            transport,
            images,
            clock,
        }
    }

    /// Build the request for a turn without sending it.
    pub async fn prepare(
        &self,
        config: &ProviderConfig,
        prior: &[Message],
        turn: &NewTurn,
        placeholder_timestamp: i64,
    ) -> Result<WireRequest, ChatError> {
        config.validate()?;

        let text = turn.trimmed_text();
        if text.is_none() && turn.image.is_none() {
            return Err(ChatError::EmptyTurn);
        }

        let image = match &turn.image {
            Some(locator) => Some(
                encode_image(self.images.as_ref(), locator)
                    .await
                    .map_err(|source| ChatError::Image {
                        provider: config.provider_kind,
                        source,
                    })?,
            ),
            None => None,
        };

        let prepared = PreparedTurn {
            text: text.unwrap_or(notices::DEFAULT_IMAGE_PROMPT).to_string(),
            image,
        };
        let window = history_window(prior, placeholder_timestamp, turn.timestamp);

        Ok(wire::build(config, &window, &prepared))
    }

    /// Send a turn and return the provider's reply as a model message.
    pub async fn complete(
        &self,
        config: &ProviderConfig,
        prior: &[Message],
        turn: &NewTurn,
        placeholder_timestamp: i64,
    ) -> Result<Message, ChatError> {
        let request = self.prepare(config, prior, turn, placeholder_timestamp).await?;

        tracing::info!(
            provider = %config.provider_kind,
            model = %config.model_name,
            url = %sanitize_for_log(&request.url),
            "Sending chat request"
        );

        let response = self
            .transport
            .execute(&request)
            .await
            .map_err(|source| ChatError::Transport {
                provider: config.provider_kind,
                source,
            })?;

        let text = wire::parse(config.provider_kind, &response).map_err(|e| {
            tracing::warn!(provider = %config.provider_kind, status = response.status, error = %e, "Chat request failed");
            e
        })?;

        Ok(Message::model(text, self.clock.now_ms()))
    }
}
