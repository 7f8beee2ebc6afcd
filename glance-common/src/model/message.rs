//! Messages and their parts.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Model => "model",
        }
    }
}

/// Base64-encoded image bytes plus their mime type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineImage {
    pub mime_type: String,
    pub data: String,
}

impl InlineImage {
    /// Encode raw bytes.
    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: BASE64.encode(bytes),
        }
    }

    /// Decode the payload back to raw bytes.
    pub fn bytes(&self) -> Result<Vec<u8>, base64::DecodeError> {
        BASE64.decode(self.data.as_bytes())
    }

    /// `data:` URI form used by OpenAI-compatible providers.
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

/// One piece of message content.
///
/// Serialized externally tagged: `{"text": "..."}` or
/// `{"inlineImage": {"mimeType": "...", "data": "..."}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Part {
    Text(String),
    InlineImage(InlineImage),
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(t) => Some(t),
            Self::InlineImage(_) => None,
        }
    }
}

/// Rejections raised while ingesting a loosely-shaped message.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MessageError {
    #[error("message is not a JSON object")]
    NotAnObject,

    #[error("message has no role")]
    MissingRole,

    #[error("unknown role '{0}'")]
    UnknownRole(String),

    #[error("message has no parts")]
    EmptyParts,

    #[error("part {index} is neither text nor an inline image")]
    InvalidPart { index: usize },

    #[error("part {index} carries image data that is not valid base64")]
    InvalidBase64 { index: usize },

    #[error("part {index} has non-image mime type '{mime_type}'")]
    NonImageMime { index: usize, mime_type: String },
}

fn is_false(flag: &bool) -> bool {
    !*flag
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub parts: Vec<Part>,
    /// Unix milliseconds.
    pub timestamp: i64,
    /// Placeholder or status line; never persisted.
    #[serde(default, skip_serializing_if = "is_false")]
    pub transient: bool,
    /// Set on model messages once their Q&A pair is archived.
    #[serde(default, skip_serializing_if = "is_false")]
    pub archived: bool,
}

impl Message {
    pub fn new(role: Role, parts: Vec<Part>, timestamp: i64) -> Self {
        Self {
            role,
            parts,
            timestamp,
            transient: false,
            archived: false,
        }
    }

    pub fn user(text: impl Into<String>, timestamp: i64) -> Self {
        Self::new(Role::User, vec![Part::text(text)], timestamp)
    }

    pub fn model(text: impl Into<String>, timestamp: i64) -> Self {
        Self::new(Role::Model, vec![Part::text(text)], timestamp)
    }

    /// Mark the message as a never-persisted placeholder.
    pub fn into_transient(mut self) -> Self {
        self.transient = true;
        self
    }

    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }

    pub fn is_model(&self) -> bool {
        self.role == Role::Model
    }

    /// All text parts joined with a newline.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(Part::as_text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Text of the first part, if it is a text part.
    pub fn first_text(&self) -> Option<&str> {
        self.parts.first().and_then(Part::as_text)
    }

    pub fn images(&self) -> impl Iterator<Item = &InlineImage> {
        self.parts.iter().filter_map(|p| match p {
            Part::InlineImage(img) => Some(img),
            Part::Text(_) => None,
        })
    }

    /// Deep copy with the `transient` and `archived` flags cleared.
    pub fn stripped(&self) -> Self {
        Self {
            transient: false,
            archived: false,
            ..self.clone()
        }
    }

    /// Validate and decode a message arriving from an untrusted surface.
    ///
    /// A missing timestamp decodes as `0`; legacy `isTempStatus` is accepted
    /// as an alias for `transient`.
    pub fn from_value(value: &Value) -> Result<Self, MessageError> {
        let obj = value.as_object().ok_or(MessageError::NotAnObject)?;

        let role = match obj.get("role").and_then(Value::as_str) {
            None => return Err(MessageError::MissingRole),
            Some("user") => Role::User,
            Some("model") => Role::Model,
            Some(other) => return Err(MessageError::UnknownRole(other.to_string())),
        };

        let raw_parts = obj
            .get("parts")
            .and_then(Value::as_array)
            .filter(|parts| !parts.is_empty())
            .ok_or(MessageError::EmptyParts)?;

        let parts = raw_parts
            .iter()
            .enumerate()
            .map(|(index, raw)| decode_part(index, raw))
            .collect::<Result<Vec<_>, _>>()?;

        let flag = |name: &str| obj.get(name).and_then(Value::as_bool).unwrap_or(false);

        Ok(Self {
            role,
            parts,
            timestamp: obj.get("timestamp").and_then(Value::as_i64).unwrap_or(0),
            transient: flag("transient") || flag("isTempStatus"),
            archived: flag("archived"),
        })
    }
}

fn decode_part(index: usize, raw: &Value) -> Result<Part, MessageError> {
    if let Some(text) = raw.get("text").and_then(Value::as_str) {
        return Ok(Part::Text(text.to_string()));
    }

    let image = raw
        .get("inlineImage")
        .or_else(|| raw.get("inlineData"))
        .ok_or(MessageError::InvalidPart { index })?;

    let mime_type = image
        .get("mimeType")
        .and_then(Value::as_str)
        .ok_or(MessageError::InvalidPart { index })?;
    let data = image
        .get("data")
        .and_then(Value::as_str)
        .ok_or(MessageError::InvalidPart { index })?;

    if !mime_type.starts_with("image/") {
        return Err(MessageError::NonImageMime {
            index,
            mime_type: mime_type.to_string(),
        });
    }
    if BASE64.decode(data.as_bytes()).is_err() {
        return Err(MessageError::InvalidBase64 { index });
    }

    Ok(Part::InlineImage(InlineImage {
        mime_type: mime_type.to_string(),
        data: data.to_string(),
    }))
}
