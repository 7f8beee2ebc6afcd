//! Archival: saving Q&A pairs and whole conversations.

use glance_common::{notices, Message, Session};

use crate::error::{ArchiveError, SessionResult};
use crate::sync::{ListTarget, SessionSync, SyncState};

/// Index of the user question answered by the model message at `index`.
pub fn find_question(messages: &[Message], index: usize) -> Result<usize, ArchiveError> {
    let answer = messages
        .get(index)
        .filter(|m| m.is_model() && !m.transient)
        .ok_or(ArchiveError::NotAModelMessage { index })?;
    if answer.archived {
        return Err(ArchiveError::AlreadyArchived { index });
    }
    messages[..index]
        .iter()
        .rposition(|m| m.is_user() && !m.transient)
        .ok_or(ArchiveError::NoMatchingQuestion { index })
}

impl SessionSync {
    /// Archive the answer at `index` together with its question.
    pub async fn archive_pair(&self, index: usize) -> Result<(), ArchiveError> {
        let mut state = self.lock().await;
        let result = self.archive_pair_locked(&mut state, index).await;

        match &result {
            Ok(()) => {
                tracing::info!(session_id = %state.active.id, index, "Q&A pair archived");
                self.push_notice_locked(&mut state, notices::QA_ARCHIVED);
            }
            Err(ArchiveError::NoMatchingQuestion { .. }) => {
                tracing::warn!(session_id = %state.active.id, index, "No question precedes answer");
                self.push_notice_locked(&mut state, notices::ARCHIVE_FAILED_NO_QUESTION);
            }
            Err(e) => tracing::warn!(index, error = %e, "Pair not archived"),
        }

        self.render_locked(&state);
        result
    }

    async fn archive_pair_locked(
        &self,
        state: &mut SyncState,
        index: usize,
    ) -> Result<(), ArchiveError> {
        let question = find_question(&state.active.messages, index)?;
        let pair = Session::with_messages(vec![
            state.active.messages[question].stripped(),
            state.active.messages[index].stripped(),
        ]);

        self.write_list(state, ListTarget::Archive, |list| list.insert(0, pair.clone()))
            .await?;
        state.active.messages[index].archived = true;
        self.persist_active(state).await?;
        Ok(())
    }

    /// Archive the whole active conversation and start a new one.
    ///
    /// Returns `false` when there was nothing to archive.
    pub async fn split_session(&self) -> SessionResult<bool> {
        let mut state = self.lock().await;
        let projection = state.active.persistable();
        if projection.is_empty() {
            return Ok(false);
        }

        let entry = Session::with_messages(projection.messages.iter().map(Message::stripped).collect());
        self.write_list(&mut state, ListTarget::Archive, |list| {
            list.insert(0, entry.clone())
        })
        .await?;

        let policy = self.inner.policy;
        self.write_list(&mut state, ListTarget::History, |list| {
            policy.push_front_unless_same(list, projection.clone());
        })
        .await?;

        let previous = state.active.id;
        state.active = Session::new();
        tracing::info!(
            previous = %previous,
            session_id = %state.active.id,
            "Session split and archived"
        );
        self.push_notice_locked(&mut state, notices::CHAT_SPLIT_ARCHIVED);
        self.render_locked(&state);
        Ok(true)
    }

    /// Replace History or Archive with an empty list.
    pub async fn clear_all(&self, target: ListTarget) -> SessionResult<()> {
        let mut state = self.lock().await;
        self.write_list(&mut state, target, |list| list.clear()).await?;
        tracing::info!(key = target.key(), "List cleared");
        self.render_locked(&state);
        Ok(())
    }
}
