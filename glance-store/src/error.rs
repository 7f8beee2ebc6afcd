//! Store errors.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The write named a version that is no longer current.
    #[error("stale write to '{key}': expected version {expected}, current is {actual}")]
    StaleWrite { key: String, expected: u64, actual: u64 },

    #[error("store backend error: {0}")]
    Backend(String),

    #[error("serialization error for '{key}': {message}")]
    Serialization { key: String, message: String },

    #[error("store is closed")]
    Closed,
}

impl StoreError {
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::StaleWrite { .. })
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Backend(e.to_string())
    }
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Backend(format!("blocking task failed: {}", e))
    }
}

impl From<StoreError> for glance_common::Error {
    fn from(e: StoreError) -> Self {
        glance_common::Error::Store(e.to_string())
    }
}
