//! Sessions: ordered conversations with a stable identity.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::message::{Message, Role};
use crate::util::take_chars;

/// Stable identity of a session, assigned when it begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Stored form. Older records are a bare message array with no id.
#[derive(Deserialize)]
#[serde(untagged)]
enum SessionRepr {
    Full {
        #[serde(default)]
        id: Option<SessionId>,
        messages: Vec<Message>,
    },
    Legacy(Vec<Message>),
}

impl From<SessionRepr> for Session {
    fn from(repr: SessionRepr) -> Self {
        match repr {
            SessionRepr::Full { id, messages } => Self {
                id: id.unwrap_or_default(),
                messages,
            },
            SessionRepr::Legacy(messages) => Self::with_messages(messages),
        }
    }
}

/// An ordered conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SessionRepr")]
pub struct Session {
    pub id: SessionId,
    pub messages: Vec<Message>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: SessionId::new(),
            messages: Vec::new(),
        }
    }

    /// A session with a fresh id and the given messages.
    pub fn with_messages(messages: Vec<Message>) -> Self {
        Self {
            id: SessionId::new(),
            messages,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Non-transient messages, in order.
    pub fn projection(&self) -> Vec<Message> {
        self.messages.iter().filter(|m| !m.transient).cloned().collect()
    }

    /// Same id, transient messages dropped.
    pub fn persistable(&self) -> Self {
        Self {
            id: self.id,
            messages: self.projection(),
        }
    }

    pub fn first_timestamp(&self) -> Option<i64> {
        self.messages.first().map(|m| m.timestamp)
    }

    /// Whether both sessions hold the same messages, ignoring ids.
    pub fn same_messages(&self, other: &Session) -> bool {
        self.messages == other.messages
    }

    /// Display title for list views.
    ///
    /// `position` is the 1-based index used when no message carries text.
    pub fn title(&self, position: usize) -> String {
        let first_text = |role: Role| {
            self.messages
                .iter()
                .find(|m| m.role == role)
                .and_then(Message::first_text)
                .filter(|t| !t.is_empty())
        };

        match (first_text(Role::User), first_text(Role::Model)) {
            (Some(question), Some(_)) if self.messages.len() == 2 => {
                format!("Q&A: {}...", take_chars(question, 40))
            }
            (Some(question), _) => format!("Conversation started: {}...", take_chars(question, 40)),
            (None, Some(answer)) => {
                format!("Conversation started (AI): {}...", take_chars(answer, 30))
            }
            (None, None) => format!("Archive {}", position),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_session_round_trip_keeps_id() {
        let session = Session::with_messages(vec![Message::user("hi", 1), Message::model("yo", 2)]);
        let json = serde_json::to_string(&session).unwrap();
        let back: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(back, session);
    }

    #[test]
    fn test_legacy_array_gets_fresh_id() {
        let legacy = json!([{"role": "user", "parts": [{"text": "old"}], "timestamp": 3}]);
        let a: Session = serde_json::from_value(legacy.clone()).unwrap();
        let b: Session = serde_json::from_value(legacy).unwrap();
        assert_eq!(a.messages[0].text(), "old");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_object_without_id_gets_fresh_id() {
        let s: Session = serde_json::from_value(json!({"messages": []})).unwrap();
        assert!(s.is_empty());
    }

    #[test]
    fn test_projection_drops_transient() {
        let session = Session::with_messages(vec![
            Message::user("q", 1),
            Message::model("Thinking...", 2).into_transient(),
        ]);
        assert_eq!(session.projection().len(), 1);
        assert_eq!(session.persistable().id, session.id);
    }

    #[test]
    fn test_titles() {
        let pair = Session::with_messages(vec![Message::user("What is Rust?", 1), Message::model("A language", 2)]);
        assert_eq!(pair.title(1), "Q&A: What is Rust?...");

        let long = "x".repeat(60);
        let conv = Session::with_messages(vec![
            Message::user(long.clone(), 1),
            Message::model("a", 2),
            Message::user("b", 3),
        ]);
        assert_eq!(conv.title(1), format!("Conversation started: {}...", &long[..40]));

        let ai_only = Session::with_messages(vec![Message::model("notice", 1)]);
        assert_eq!(ai_only.title(1), "Conversation started (AI): notice...");

        assert_eq!(Session::new().title(4), "Archive 4");
    }

    #[test]
    fn test_session_id_parse() {
        let id = SessionId::new();
        let parsed: SessionId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert!("nope".parse::<SessionId>().is_err());
    }
}
