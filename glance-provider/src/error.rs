//! Provider errors and their user-facing wording.

use glance_common::model::ConfigError;
use glance_common::{notices, ProviderKind};
use thiserror::Error;

/// Network failure before any HTTP status was received.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Failure loading an image for inline encoding.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ImageFetchError {
    #[error("{0}")]
    Transport(String),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("Invalid MIME type: {0}")]
    InvalidMime(String),

    #[error("Invalid data URI")]
    InvalidDataUri,

    #[error("Unsupported image locator: {0}")]
    UnsupportedLocator(String),
}

/// Every way a chat turn can fail.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChatError {
    #[error("provider configuration is incomplete: {0}")]
    Config(#[from] ConfigError),

    /// Neither text nor image.
    #[error("no content to send")]
    EmptyTurn,

    #[error("image processing failed ({provider}): {source}")]
    Image {
        provider: ProviderKind,
        #[source]
        source: ImageFetchError,
    },

    #[error("transport error ({provider}): {source}")]
    Transport {
        provider: ProviderKind,
        #[source]
        source: TransportError,
    },

    /// Non-success status, or a success status whose body carries an error.
    #[error("{provider} returned {status}: {message}")]
    Status {
        provider: ProviderKind,
        status: u16,
        message: String,
        detail: Option<String>,
    },

    /// Success status with no usable content.
    #[error("malformed response from {provider}")]
    Malformed { provider: ProviderKind },

    /// Gemini refused the prompt.
    #[error("request blocked: {reason}")]
    Blocked { reason: String, message: Option<String> },
}

impl ChatError {
    /// Text shown to the user in place of a reply.
    pub fn user_message(&self) -> String {
        match self {
            Self::Config(ConfigError::MissingCredential) => notices::API_KEY_MISSING.to_string(),
            Self::Config(ConfigError::MissingModel) => notices::MODEL_NAME_MISSING.to_string(),
            Self::Config(ConfigError::MissingEndpoint) => notices::ENDPOINT_MISSING.to_string(),
            Self::Config(ConfigError::NoConfiguration) => notices::CONFIG_MISSING.to_string(),
            Self::EmptyTurn => "No content to send to AI.".to_string(),
            Self::Image { provider, source } => {
                notices::image_processing_error(provider.display_name(), &source.to_string())
            }
            Self::Transport { provider, source } => {
                notices::api_comms_error(provider.as_str(), &source.0)
            }
            Self::Status {
                provider,
                message,
                detail,
                ..
            } => {
                let mut text = notices::api_call_failed(provider.as_str(), message);
                if let Some(detail) = detail {
                    text.push(' ');
                    text.push_str(detail);
                }
                text
            }
            Self::Malformed { provider } => format!(
                "Failed to get valid response from {} API.",
                provider.display_name()
            ),
            Self::Blocked { reason, message } => format!(
                "Request blocked (Gemini): {}. {}",
                reason,
                message.as_deref().unwrap_or_default()
            )
            .trim_end()
            .to_string(),
        }
    }

    /// Whether the failure means the configuration must be fixed before retrying.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}
