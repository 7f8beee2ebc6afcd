//! Gemini `generateContent`.

use glance_common::{Message, ProviderConfig, ProviderKind};
use serde::{Deserialize, Serialize};

use super::{status_fallback, PreparedTurn};
use crate::error::ChatError;
use crate::transport::{WireRequest, WireResponse};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart<'a> {
    Text {
        text: String,
    },
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData<'a>,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    parts: Option<Vec<ResponsePart>>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
    block_reason_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: Option<String>,
    details: Option<serde_json::Value>,
}

fn endpoint(config: &ProviderConfig) -> String {
    let base = match config.endpoint.trim() {
        "" => DEFAULT_BASE_URL,
        custom => custom.trim_end_matches('/'),
    };
    let model = config
        .model_name
        .strip_prefix("models/")
        .unwrap_or(&config.model_name);
    let key: String = url::form_urlencoded::byte_serialize(config.credential.as_bytes()).collect();
    format!("{}/models/{}:generateContent?key={}", base, model, key)
}

pub(super) fn build(config: &ProviderConfig, window: &[&Message], turn: &PreparedTurn) -> WireRequest {
    let mut contents: Vec<Content<'_>> = window
        .iter()
        .map(|msg| Content {
            role: msg.role.as_str(),
            parts: vec![RequestPart::Text { text: msg.text() }],
        })
        .collect();

    let mut parts = vec![RequestPart::Text {
        text: turn.text.clone(),
    }];
    if let Some(image) = &turn.image {
        parts.push(RequestPart::Inline {
            inline_data: InlineData {
                mime_type: &image.mime_type,
                data: &image.data,
            },
        });
    }
    contents.push(Content { role: "user", parts });

    let body = serde_json::to_value(GenerateContentRequest { contents }).unwrap_or_default();

    WireRequest {
        kind: ProviderKind::Gemini,
        url: endpoint(config),
        headers: vec![("Content-Type".into(), "application/json".into())],
        body,
    }
}

pub(super) fn parse(response: &WireResponse) -> Result<String, ChatError> {
    if !response.is_success() {
        let error = serde_json::from_str::<ErrorEnvelope>(&response.body)
            .ok()
            .and_then(|e| e.error);
        let message = error
            .as_ref()
            .and_then(|e| e.message.clone())
            .unwrap_or_else(|| status_fallback(response.status));
        let detail = error
            .and_then(|e| e.details)
            .map(|details| format!("Details: {}", details));
        return Err(ChatError::Status {
            provider: ProviderKind::Gemini,
            status: response.status,
            message,
            detail,
        });
    }

    let malformed = || ChatError::Malformed {
        provider: ProviderKind::Gemini,
    };
    let parsed: GenerateContentResponse =
        serde_json::from_str(&response.body).map_err(|_| malformed())?;

    let parts = parsed
        .candidates
        .and_then(|c| c.into_iter().next())
        .and_then(|c| c.content)
        .and_then(|c| c.parts);

    if let Some(parts) = parts {
        return Ok(parts
            .into_iter()
            .filter_map(|p| p.text)
            .collect::<Vec<_>>()
            .join("\n"));
    }

    match parsed.prompt_feedback {
        Some(PromptFeedback {
            block_reason: Some(reason),
            block_reason_message,
        }) => Err(ChatError::Blocked {
            reason,
            message: block_reason_message,
        }),
        _ => {
            tracing::warn!("Gemini response did not contain expected content");
            Err(malformed())
        }
    }
}
