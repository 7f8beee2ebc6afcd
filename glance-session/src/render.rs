//! Render callback invoked whenever a synchronizer's mirrors change.

use glance_common::{Message, PromptTemplate, ProviderKind, Session, SessionId};
use std::sync::Mutex;

/// Everything a surface needs to redraw.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncSnapshot {
    pub session_id: SessionId,
    pub messages: Vec<Message>,
    pub history: Vec<Session>,
    pub archive_count: usize,
    pub templates: Vec<PromptTemplate>,
    pub input_enabled: bool,
    pub provider_name: Option<String>,
    pub provider_kind: Option<ProviderKind>,
}

pub trait RenderSink: Send + Sync {
    fn render(&self, snapshot: &SyncSnapshot);
}

/// Drops every frame.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRender;

impl RenderSink for NullRender {
    fn render(&self, _snapshot: &SyncSnapshot) {}
}

/// Keeps the latest frame and a frame count.
#[derive(Debug, Default)]
pub struct LatestFrame {
    inner: Mutex<(usize, Option<SyncSnapshot>)>,
}

impl LatestFrame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> usize {
        self.inner.lock().map(|g| g.0).unwrap_or_default()
    }

    pub fn latest(&self) -> Option<SyncSnapshot> {
        self.inner.lock().ok().and_then(|g| g.1.clone())
    }
}

impl RenderSink for LatestFrame {
    fn render(&self, snapshot: &SyncSnapshot) {
        if let Ok(mut guard) = self.inner.lock() {
            guard.0 += 1;
            guard.1 = Some(snapshot.clone());
        }
    }
}
