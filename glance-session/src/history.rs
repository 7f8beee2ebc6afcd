//! Capped, most-recent-first History list and its upsert rule.

use glance_common::config::HistoryConfig;
use glance_common::{Session, SessionId, UpsertKeyPolicy};

/// A session was inserted a second time because its natural key changed.
///
/// Only possible under [`UpsertKeyPolicy::FirstMessageTimestamp`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationAnomaly {
    pub session_id: SessionId,
    /// Index of the entry that already carried this session id.
    pub existing_index: usize,
}

/// What an upsert did to the list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertAction {
    Replaced { index: usize },
    Inserted,
    /// Empty projections are never stored.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub action: UpsertAction,
    pub evicted: usize,
    pub anomaly: Option<ReconciliationAnomaly>,
}

/// Cap and key policy for the History list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryPolicy {
    pub cap: usize,
    pub key: UpsertKeyPolicy,
}

impl Default for HistoryPolicy {
    fn default() -> Self {
        Self::from(&HistoryConfig::default())
    }
}

impl From<&HistoryConfig> for HistoryPolicy {
    fn from(config: &HistoryConfig) -> Self {
        Self {
            cap: config.cap,
            key: config.upsert_key,
        }
    }
}

impl HistoryPolicy {
    /// Store the durable projection of `active`: replace the matching entry in
    /// place, or insert at the front, then truncate to the cap.
    pub fn upsert(&self, history: &mut Vec<Session>, active: &Session) -> UpsertOutcome {
        let projection = active.persistable();
        if projection.is_empty() {
            return UpsertOutcome {
                action: UpsertAction::Skipped,
                evicted: 0,
                anomaly: None,
            };
        }

        let position = match self.key {
            UpsertKeyPolicy::SessionId => history.iter().position(|s| s.id == projection.id),
            UpsertKeyPolicy::FirstMessageTimestamp => {
                let first = projection.first_timestamp();
                history
                    .iter()
                    .position(|s| !s.is_empty() && s.first_timestamp() == first)
            }
        };

        let mut anomaly = None;
        let action = match position {
            Some(index) => {
                history[index] = projection;
                UpsertAction::Replaced { index }
            }
            None => {
                if let Some(existing_index) = history.iter().position(|s| s.id == projection.id) {
                    tracing::warn!(
                        session_id = %projection.id,
                        existing_index,
                        "First message changed; session stored twice in history"
                    );
                    anomaly = Some(ReconciliationAnomaly {
                        session_id: projection.id,
                        existing_index,
                    });
                }
                history.insert(0, projection);
                UpsertAction::Inserted
            }
        };

        UpsertOutcome {
            action,
            evicted: self.truncate(history),
            anomaly,
        }
    }

    /// Insert a session at the front unless the front already holds the same
    /// messages.
    pub fn push_front_unless_same(&self, history: &mut Vec<Session>, session: Session) -> bool {
        if history.first().is_some_and(|front| front.same_messages(&session)) {
            return false;
        }
        history.insert(0, session);
        self.truncate(history);
        true
    }

    /// Drop the oldest entries beyond the cap. Returns how many were dropped.
    pub fn truncate(&self, history: &mut Vec<Session>) -> usize {
        let evicted = history.len().saturating_sub(self.cap);
        history.truncate(self.cap);
        evicted
    }
}

/// Clean a list read from storage: strip transient messages and drop
/// sessions left empty.
pub fn sanitize(sessions: Vec<Session>) -> Vec<Session> {
    sessions
        .into_iter()
        .map(|s| s.persistable())
        .filter(|s| !s.is_empty())
        .collect()
}
