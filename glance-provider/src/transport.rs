//! Executing wire requests.

use async_trait::async_trait;
use glance_common::config::HttpConfig;
use glance_common::util::sanitize_for_log;
use glance_common::ProviderKind;
use reqwest::Client;
use serde_json::Value;
use std::time::{Duration, Instant};

use crate::error::TransportError;

/// One provider call, fully built.
#[derive(Debug, Clone, PartialEq)]
pub struct WireRequest {
    pub kind: ProviderKind,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Value,
}

impl WireRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Raw provider reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireResponse {
    pub status: u16,
    pub body: String,
}

impl WireResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends a [`WireRequest`] and returns whatever status and body came back.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn execute(&self, request: &WireRequest) -> Result<WireResponse, TransportError>;
}

/// reqwest-backed transport.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(config: &HttpConfig) -> Self {
        Self {
            client: build_client(config),
        }
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new(&HttpConfig::default())
    }
}

/// Shared client construction for provider calls and image fetches.
pub(crate) fn build_client(config: &HttpConfig) -> Client {
    Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .build()
        .unwrap_or_else(|_| Client::new())
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn execute(&self, request: &WireRequest) -> Result<WireResponse, TransportError> {
        let start = Instant::now();
        let mut builder = self.client.post(&request.url).body(request.body.to_string());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await.map_err(|e| {
            let e = e.without_url();
            tracing::warn!(
                provider = %request.kind,
                url = %sanitize_for_log(&request.url),
                error = %e,
                "Provider request failed"
            );
            TransportError(format!("Request failed: {}", e))
        })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError(format!("Failed to read response body: {}", e.without_url())))?;

        tracing::debug!(
            provider = %request.kind,
            status,
            latency_ms = start.elapsed().as_millis() as u64,
            "Provider responded"
        );

        Ok(WireResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let req = WireRequest {
            kind: ProviderKind::OpenAi,
            url: "https://api.test".into(),
            headers: vec![("Authorization".into(), "Bearer sk".into())],
            body: Value::Null,
        };
        assert_eq!(req.header("authorization"), Some("Bearer sk"));
        assert_eq!(req.header("x-missing"), None);
    }

    #[test]
    fn test_response_success_range() {
        assert!(WireResponse::new(200, "").is_success());
        assert!(WireResponse::new(204, "").is_success());
        assert!(!WireResponse::new(429, "").is_success());
    }
}
