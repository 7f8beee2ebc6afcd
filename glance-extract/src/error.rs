//! Error types for glance-extract.

use glance_common::notices;

/// Terminal extraction failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractionError {
    #[error("{}", notices::PAGE_LOAD_TIMEOUT)]
    Timeout { url: String },

    #[error("Could not extract article content using Readability or fallback.")]
    NoContent { url: String },

    /// Capturing the page or running the extractor failed.
    #[error("{}", notices::extraction_injection_failed(.0))]
    Capture(String),

    #[error("Tab closed before the page finished loading")]
    TabClosed,

    #[error("{}", notices::cannot_open_link(.0))]
    Open(String),
}

impl ExtractionError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

impl From<ExtractionError> for glance_common::Error {
    fn from(e: ExtractionError) -> Self {
        match e {
            ExtractionError::Timeout { .. } => glance_common::Error::Timeout,
            other => glance_common::Error::External(other.to_string()),
        }
    }
}
