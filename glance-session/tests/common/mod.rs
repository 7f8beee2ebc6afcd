//! Shared fixtures for synchronizer tests.

#![allow(dead_code)]

use async_trait::async_trait;
use glance_common::config::Config;
use glance_common::{ManualClock, MonotonicClock, ProviderConfig, ProviderKind};
use glance_provider::{
    ChatClient, ChatTransport, FetchedImage, ImageFetchError, ImageFetcher, TransportError,
    WireRequest, WireResponse,
};
use glance_session::{NullRender, SessionSync};
use glance_store::{keys, MemoryStore, Store, StoreExt, WriteOptions};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;

/// Replies to every request with the same canned result.
pub struct Canned {
    pub requests: Mutex<Vec<WireRequest>>,
    reply: Result<WireResponse, TransportError>,
}

impl Canned {
    pub fn answering(text: &str) -> Arc<Self> {
        let body = serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": text }] } }]
        });
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            reply: Ok(WireResponse::new(200, body.to_string())),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            reply: Err(TransportError(message.to_string())),
        })
    }

    pub fn sent(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_body(&self) -> String {
        self.requests
            .lock()
            .unwrap()
            .last()
            .map(|r| r.body.to_string())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ChatTransport for Canned {
    async fn execute(&self, request: &WireRequest) -> Result<WireResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        self.reply.clone()
    }
}

/// Holds each request until a permit is released, then answers "ok".
pub struct Gated {
    pub requests: Mutex<Vec<WireRequest>>,
    gate: Semaphore,
}

impl Gated {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            gate: Semaphore::new(0),
        })
    }

    pub fn release(&self, count: usize) {
        self.gate.add_permits(count);
    }

    pub fn sent(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn bodies(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.body.to_string())
            .collect()
    }
}

#[async_trait]
impl ChatTransport for Gated {
    async fn execute(&self, request: &WireRequest) -> Result<WireResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| TransportError(e.to_string()))?;
        permit.forget();
        let body = serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": "ok" }] } }]
        });
        Ok(WireResponse::new(200, body.to_string()))
    }
}

pub struct NoImages;

#[async_trait]
impl ImageFetcher for NoImages {
    async fn fetch(&self, _locator: &str) -> Result<FetchedImage, ImageFetchError> {
        Err(ImageFetchError::Status(404))
    }
}

pub fn gemini_config() -> ProviderConfig {
    ProviderConfig::new("Main", ProviderKind::Gemini, "key", "gemini-1.5-flash")
}

/// Save one provider configuration and mark it active.
pub async fn install_config(store: &MemoryStore, config: &ProviderConfig) {
    let options = WriteOptions::new("options");
    store
        .save(keys::PROVIDER_CONFIGS, &vec![config.clone()], options.clone())
        .await
        .unwrap();
    store
        .save(keys::ACTIVE_PROVIDER_CONFIG_ID, &config.id, options)
        .await
        .unwrap();
}

/// An initialized synchronizer for `origin`.
pub async fn sync_for(
    origin: &str,
    store: Arc<MemoryStore>,
    transport: Arc<dyn ChatTransport>,
) -> SessionSync {
    let clock = Arc::new(MonotonicClock::new(Arc::new(ManualClock::new(1_000))));
    let client = ChatClient::new(transport, Arc::new(NoImages), clock.clone());
    let sync = SessionSync::new(
        origin,
        store as Arc<dyn Store>,
        client,
        clock,
        Arc::new(NullRender),
        &Config::default(),
    );
    sync.init().await.unwrap();
    sync
}

/// Poll `check` until it holds or a second passes.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..100 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
