//! Error types for glance-session.

use glance_common::SessionId;
use glance_store::StoreError;
use thiserror::Error;

/// Why a Q&A pair could not be archived.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("no user question precedes the answer at index {index}")]
    NoMatchingQuestion { index: usize },

    #[error("message at index {index} is not an answer that can be archived")]
    NotAModelMessage { index: usize },

    #[error("answer at index {index} is already archived")]
    AlreadyArchived { index: usize },

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("session {0} not found")]
    NotFound(SessionId),
}

pub type SessionResult<T> = Result<T, SessionError>;

impl From<SessionError> for glance_common::Error {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::Store(store) | SessionError::Archive(ArchiveError::Store(store)) => {
                store.into()
            }
            SessionError::NotFound(id) => glance_common::Error::NotFound(id.to_string()),
            SessionError::Archive(archive) => {
                glance_common::Error::InvalidInput(archive.to_string())
            }
        }
    }
}
