//! OpenAI-compatible `chat/completions`.

use glance_common::{Message, ProviderConfig, ProviderKind, Role};
use serde::{Deserialize, Serialize};

use super::{status_fallback, PreparedTurn};
use crate::error::ChatError;
use crate::transport::{WireRequest, WireResponse};

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: MessageContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Option<Vec<Choice>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: Option<String>,
    #[serde(rename = "type")]
    error_type: Option<String>,
}

fn role(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Model => "assistant",
    }
}

pub(super) fn build(config: &ProviderConfig, window: &[&Message], turn: &PreparedTurn) -> WireRequest {
    let mut messages: Vec<ChatMessage> = window
        .iter()
        .map(|msg| ChatMessage {
            role: role(msg.role),
            content: MessageContent::Text(msg.text()),
        })
        .collect();

    let content = match &turn.image {
        None => MessageContent::Text(turn.text.clone()),
        Some(image) => MessageContent::Parts(vec![
            ContentPart::Text {
                text: turn.text.clone(),
            },
            ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: image.data_uri(),
                },
            },
        ]),
    };
    messages.push(ChatMessage {
        role: "user",
        content,
    });

    let body = serde_json::to_value(ChatCompletionRequest {
        model: &config.model_name,
        messages,
    })
    .unwrap_or_default();

    WireRequest {
        kind: ProviderKind::OpenAi,
        url: config.endpoint.trim().to_string(),
        headers: vec![
            ("Content-Type".into(), "application/json".into()),
            ("Authorization".into(), format!("Bearer {}", config.credential)),
        ],
        body,
    }
}

fn api_error(error: ApiError, status: u16) -> ChatError {
    ChatError::Status {
        provider: ProviderKind::OpenAi,
        status,
        message: error.message.unwrap_or_else(|| status_fallback(status)),
        detail: error.error_type.map(|t| format!("Type: {}", t)),
    }
}

pub(super) fn parse(response: &WireResponse) -> Result<String, ChatError> {
    let parsed = serde_json::from_str::<ChatCompletionResponse>(&response.body);

    if !response.is_success() {
        let error = parsed.ok().and_then(|r| r.error).unwrap_or(ApiError {
            message: None,
            error_type: None,
        });
        return Err(api_error(error, response.status));
    }

    let malformed = ChatError::Malformed {
        provider: ProviderKind::OpenAi,
    };
    let parsed = parsed.map_err(|_| malformed.clone())?;

    let content = parsed
        .choices
        .and_then(|c| c.into_iter().next())
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .filter(|c| !c.is_empty());

    match (content, parsed.error) {
        (Some(text), _) => Ok(text),
        (None, Some(error)) => Err(api_error(error, response.status)),
        (None, None) => {
            tracing::warn!("OpenAI response did not contain expected content");
            Err(malformed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glance_common::InlineImage;
    use serde_json::json;

    fn config() -> ProviderConfig {
        ProviderConfig::new("o", ProviderKind::OpenAi, "sk-test", "gpt-4o")
            .with_endpoint("https://api.test/v1/chat/completions")
    }

    #[test]
    fn test_build_text_turn() {
        let history = [Message::user("hi", 1), Message::model("hello", 2)];
        let window: Vec<&Message> = history.iter().collect();
        let turn = PreparedTurn {
            text: "next".into(),
            image: None,
        };

        let req = build(&config(), &window, &turn);
        assert_eq!(req.url, "https://api.test/v1/chat/completions");
        assert_eq!(req.header("authorization"), Some("Bearer sk-test"));
        assert_eq!(
            req.body,
            json!({"model": "gpt-4o", "messages": [
                {"role": "user", "content": "hi"},
                {"role": "assistant", "content": "hello"},
                {"role": "user", "content": "next"}
            ]})
        );
    }

    #[test]
    fn test_build_image_turn() {
        let turn = PreparedTurn {
            text: "Please describe this image.".into(),
            image: Some(InlineImage::from_bytes("image/jpeg", &[1, 2, 3])),
        };
        let req = build(&config(), &[], &turn);
        assert_eq!(
            req.body["messages"][0]["content"],
            json!([
                {"type": "text", "text": "Please describe this image."},
                {"type": "image_url", "image_url": {"url": "data:image/jpeg;base64,AQID"}}
            ])
        );
    }

    #[test]
    fn test_parse_success() {
        let body = json!({"choices": [{"message": {"role": "assistant", "content": "Hello!"}}]});
        assert_eq!(parse(&WireResponse::new(200, body.to_string())).unwrap(), "Hello!");
    }

    #[test]
    fn test_parse_error_in_success_body() {
        let body = json!({"error": {"message": "quota exceeded", "type": "insufficient_quota"}});
        let err = parse(&WireResponse::new(200, body.to_string())).unwrap_err();
        assert_eq!(
            err,
            ChatError::Status {
                provider: ProviderKind::OpenAi,
                status: 200,
                message: "quota exceeded".into(),
                detail: Some("Type: insufficient_quota".into()),
            }
        );
    }

    #[test]
    fn test_parse_error_status() {
        let body = json!({"error": {"message": "Incorrect API key", "type": "invalid_request_error"}});
        let err = parse(&WireResponse::new(401, body.to_string())).unwrap_err();
        assert!(matches!(err, ChatError::Status { status: 401, .. }));

        let err = parse(&WireResponse::new(502, "<html>bad gateway</html>")).unwrap_err();
        assert!(matches!(err, ChatError::Status { ref message, .. } if message == "HTTP 502"));
    }

    #[test]
    fn test_parse_malformed() {
        for body in ["", "{}", r#"{"choices": [{"message": {"content": ""}}]}"#] {
            let err = parse(&WireResponse::new(200, body)).unwrap_err();
            assert!(matches!(err, ChatError::Malformed { .. }), "body: {:?}", body);
        }
    }
}
