//! Wire protocols.
//!
//! Both protocols receive the same inputs: the resolved provider
//! configuration, the history window and a prepared turn. Each builds its own
//! request shape and parses its own response shape.

mod gemini;
mod openai;

use glance_common::{InlineImage, Message, ProviderConfig, ProviderKind};

use crate::error::ChatError;
use crate::transport::{WireRequest, WireResponse};

/// The current turn after image fetching and prompt substitution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedTurn {
    /// Never empty.
    pub text: String,
    pub image: Option<InlineImage>,
}

/// Build the single request for `config`'s provider.
pub fn build(config: &ProviderConfig, window: &[&Message], turn: &PreparedTurn) -> WireRequest {
    match config.provider_kind {
        ProviderKind::Gemini => gemini::build(config, window, turn),
        ProviderKind::OpenAi => openai::build(config, window, turn),
    }
}

/// Parse a provider reply into the reply text.
pub fn parse(kind: ProviderKind, response: &WireResponse) -> Result<String, ChatError> {
    match kind {
        ProviderKind::Gemini => gemini::parse(response),
        ProviderKind::OpenAi => openai::parse(response),
    }
}

/// Fallback message for a non-success status whose body has no error message.
fn status_fallback(status: u16) -> String {
    format!("HTTP {}", status)
}
