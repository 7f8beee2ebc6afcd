//! Per-context session synchronizer.
//!
//! Each execution context (sidebar, archive page, CLI) owns one
//! [`SessionSync`]. It keeps in-memory mirrors of the shared store keys, the
//! active session buffer and the input gate. Local mutations are written
//! through to the store with the last-seen version; foreign changes arrive as
//! [`StoreChange`] notifications and replace the mirrors.
//!
//! ```text
//!   send() ─► compose ─► push user msg ─► placeholder ─► ChatClient ─► reply
//!                              │                                      │
//!                              └──────────► History upsert ◄──────────┘
//!                                                │
//!   watch() ◄── StoreChange (other origins) ◄── Store
//! ```

use async_trait::async_trait;
use glance_common::config::Config;
use glance_common::{
    notices, Clock, ConfigError, Message, PromptTemplate, ProviderConfig, Session, SessionId,
};
use glance_provider::{ChatClient, ChatError, NewTurn};
use glance_store::{keys, Store, StoreChange, StoreError, StoreExt, WriteOptions};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex, MutexGuard};
use tokio::task::JoinHandle;

use crate::compose::{compose, summarize_prompt};
use crate::error::{SessionError, SessionResult};
use crate::history::{sanitize, HistoryPolicy};
use crate::render::{RenderSink, SyncSnapshot};
use crate::templates::{find, seed_builtins, PRESET_SUMMARIZE_ID};

/// Attempts per write before a stale-version conflict is reported.
const MAX_WRITE_ATTEMPTS: usize = 3;

/// Status shown while the current page's text is being collected.
const PAGE_STATUS: &str = "(Thinking...)";

/// Which stored session list an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListTarget {
    History,
    Archive,
}

impl ListTarget {
    pub fn key(self) -> &'static str {
        match self {
            Self::History => keys::SESSION_HISTORY,
            Self::Archive => keys::ARCHIVE_STORE,
        }
    }
}

/// What the user submitted from the input box.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserInput {
    pub text: String,
    pub selected_text: Option<String>,
    /// URL or data URI of an attached image.
    pub image: Option<String>,
}

impl UserInput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_selection(mut self, selected: impl Into<String>) -> Self {
        self.selected_text = Some(selected.into());
        self
    }

    pub fn with_image(mut self, locator: impl Into<String>) -> Self {
        self.image = Some(locator.into());
        self
    }
}

/// Supplies the text of the page the user is looking at.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Extracted page text, or a user-facing error.
    async fn content_for_summary(&self) -> Result<String, String>;
}

/// Result of resolving the active provider configuration.
enum ProviderStatus {
    Ready(ProviderConfig),
    Incomplete(ProviderConfig, ConfigError),
    Missing,
    LoadFailed(StoreError),
}

pub(crate) struct SyncState {
    pub(crate) active: Session,
    pub(crate) history: Vec<Session>,
    pub(crate) history_version: u64,
    pub(crate) archive: Vec<Session>,
    pub(crate) archive_version: u64,
    pub(crate) templates: Vec<PromptTemplate>,
    pub(crate) templates_version: u64,
    configs_version: u64,
    active_id_version: u64,
    pub(crate) provider: Option<ProviderConfig>,
    provider_error: Option<ConfigError>,
    pub(crate) input_enabled: bool,
}

impl SyncState {
    fn new() -> Self {
        Self {
            active: Session::new(),
            history: Vec::new(),
            history_version: 0,
            archive: Vec::new(),
            archive_version: 0,
            templates: Vec::new(),
            templates_version: 0,
            configs_version: 0,
            active_id_version: 0,
            provider: None,
            provider_error: None,
            input_enabled: false,
        }
    }

    fn list_mut(&mut self, target: ListTarget) -> (&mut Vec<Session>, &mut u64) {
        match target {
            ListTarget::History => (&mut self.history, &mut self.history_version),
            ListTarget::Archive => (&mut self.archive, &mut self.archive_version),
        }
    }

    fn version_mut(&mut self, key: &str) -> Option<&mut u64> {
        match key {
            keys::SESSION_HISTORY => Some(&mut self.history_version),
            keys::ARCHIVE_STORE => Some(&mut self.archive_version),
            keys::PROMPT_TEMPLATES => Some(&mut self.templates_version),
            keys::PROVIDER_CONFIGS => Some(&mut self.configs_version),
            keys::ACTIVE_PROVIDER_CONFIG_ID => Some(&mut self.active_id_version),
            _ => None,
        }
    }

    fn snapshot(&self) -> SyncSnapshot {
        SyncSnapshot {
            session_id: self.active.id,
            messages: self.active.messages.clone(),
            history: self.history.clone(),
            archive_count: self.archive.len(),
            templates: self.templates.clone(),
            input_enabled: self.input_enabled,
            provider_name: self.provider.as_ref().map(|c| c.display_name.clone()),
            provider_kind: self.provider.as_ref().map(|c| c.provider_kind),
        }
    }

    fn summarize_body(&self) -> String {
        find(&self.templates, PRESET_SUMMARIZE_ID)
            .map(|t| t.body.clone())
            .unwrap_or_else(|| notices::PRESET_SUMMARIZE_BODY.to_string())
    }
}

pub(crate) struct Inner {
    origin: String,
    store: Arc<dyn Store>,
    client: ChatClient,
    clock: Arc<dyn Clock>,
    render: Arc<dyn RenderSink>,
    pub(crate) policy: HistoryPolicy,
    notice_ttl: Duration,
    state: Mutex<SyncState>,
    /// Held from appending a question until its reply is folded in.
    in_flight: Mutex<()>,
}

/// Handle to one context's synchronizer. Cheap to clone.
#[derive(Clone)]
pub struct SessionSync {
    pub(crate) inner: Arc<Inner>,
}

impl SessionSync {
    /// `clock` must never repeat a timestamp; use the same clock for `client`.
    pub fn new(
        origin: impl Into<String>,
        store: Arc<dyn Store>,
        client: ChatClient,
        clock: Arc<dyn Clock>,
        render: Arc<dyn RenderSink>,
        config: &Config,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                origin: origin.into(),
                store,
                client,
                clock,
                render,
                policy: HistoryPolicy::from(&config.history),
                notice_ttl: config.notices.ttl(),
                state: Mutex::new(SyncState::new()),
                in_flight: Mutex::new(()),
            }),
        }
    }

    pub fn origin(&self) -> &str {
        &self.inner.origin
    }

    /// Load every mirror, seed templates and the active buffer, then resolve
    /// the provider configuration.
    pub async fn init(&self) -> SessionResult<()> {
        let store = &self.inner.store;
        let mut state = self.lock().await;

        let (history, version) = store.load_or_default::<Vec<Session>>(keys::SESSION_HISTORY).await?;
        state.history = sanitize(history);
        state.history_version = version;

        let (archive, version) = store.load_or_default::<Vec<Session>>(keys::ARCHIVE_STORE).await?;
        state.archive = sanitize(archive);
        state.archive_version = version;

        let (mut templates, mut version) = store
            .load_or_default::<Vec<PromptTemplate>>(keys::PROMPT_TEMPLATES)
            .await?;
        if seed_builtins(&mut templates) {
            version = store
                .save(keys::PROMPT_TEMPLATES, &templates, self.write_options())
                .await?;
            tracing::info!(count = templates.len(), "Seeded builtin prompt templates");
        }
        state.templates = templates;
        state.templates_version = version;

        if state.active.is_empty() {
            if let Some(latest) = state.history.first() {
                state.active = latest.clone();
            }
        }

        let status = self.load_provider(&mut state).await;
        self.apply_provider_status(&mut state, status, true).await?;

        tracing::info!(
            origin = %self.inner.origin,
            session_id = %state.active.id,
            history = state.history.len(),
            archive = state.archive.len(),
            input_enabled = state.input_enabled,
            "Session synchronizer ready"
        );
        self.render_locked(&state);
        Ok(())
    }

    /// Follow store changes made by other contexts until the store closes.
    ///
    /// The subscription is taken before this returns, so no change committed
    /// afterwards is missed.
    pub fn watch(&self) -> JoinHandle<()> {
        let mut changes = self.inner.store.subscribe();
        let sync = self.clone();

        tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(change) => {
                        if let Err(e) = sync.apply_change(change).await {
                            tracing::warn!(error = %e, "Failed to apply store change");
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "Store notifications lagged; reloading mirrors");
                        if let Err(e) = sync.reload().await {
                            tracing::warn!(error = %e, "Failed to reload mirrors");
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            tracing::debug!("Store change stream ended");
        })
    }

    /// Fold one change notification into the mirrors.
    ///
    /// Changes from this context and changes older than the mirror are ignored.
    pub async fn apply_change(&self, change: StoreChange) -> SessionResult<()> {
        if change.origin == self.inner.origin {
            return Ok(());
        }

        let mut state = self.lock().await;
        let Some(seen) = state.version_mut(&change.key) else {
            return Ok(());
        };
        if change.version <= *seen {
            tracing::debug!(key = %change.key, version = change.version, "Ignoring outdated change");
            return Ok(());
        }
        *seen = change.version;

        tracing::debug!(
            key = %change.key,
            version = change.version,
            origin = %change.origin,
            "Applying foreign change"
        );

        match change.key.as_str() {
            keys::SESSION_HISTORY => state.history = sanitize(decode_or_default(&change)?),
            keys::ARCHIVE_STORE => state.archive = sanitize(decode_or_default(&change)?),
            keys::PROMPT_TEMPLATES => state.templates = decode_or_default(&change)?,
            _ => {
                let status = self.load_provider(&mut state).await;
                self.apply_provider_status(&mut state, status, false).await?;
            }
        }

        self.render_locked(&state);
        Ok(())
    }

    /// Re-read the list mirrors from the store.
    pub async fn reload(&self) -> SessionResult<()> {
        let store = &self.inner.store;
        let mut state = self.lock().await;
        let (history, version) = store.load_or_default::<Vec<Session>>(keys::SESSION_HISTORY).await?;
        state.history = history;
        state.history_version = version;
        let (archive, version) = store.load_or_default::<Vec<Session>>(keys::ARCHIVE_STORE).await?;
        state.archive = archive;
        state.archive_version = version;
        let (templates, version) = store
            .load_or_default::<Vec<PromptTemplate>>(keys::PROMPT_TEMPLATES)
            .await?;
        state.templates = templates;
        state.templates_version = version;
        self.render_locked(&state);
        Ok(())
    }

    /// Send the user's input to the active provider.
    ///
    /// The user message stays in the conversation whatever happens to the
    /// provider call.
    pub async fn send(&self, input: UserInput) -> SessionResult<()> {
        let turn = match compose(&input.text, input.selected_text.as_deref(), input.image.is_some()) {
            Ok(turn) => turn,
            Err(e) => {
                let mut state = self.lock().await;
                self.push_notice_locked(&mut state, e.to_string());
                self.render_locked(&state);
                return Ok(());
            }
        };

        let turn_lock = self.begin_turn().await;
        let displayed_at = {
            let mut state = self.lock().await;
            if state.provider.is_none() {
                let text = config_error_text(state.provider_error.clone());
                state.input_enabled = false;
                self.push_error_locked(&mut state, text).await?;
                self.render_locked(&state);
                return Ok(());
            }

            let message = self.user_message(turn.display);
            let timestamp = message.timestamp;
            self.push_locked(&mut state, message).await?;
            self.render_locked(&state);
            timestamp
        };

        self.ask(&turn_lock, turn.prompt, input.image, Some(displayed_at))
            .await
    }

    /// Summarize the page a [`PageSource`] describes.
    pub async fn summarize_page(&self, source: &dyn PageSource) -> SessionResult<()> {
        let turn_lock = self.begin_turn().await;
        let status = {
            let mut state = self.lock().await;
            let status = self.model_message(PAGE_STATUS).into_transient();
            let timestamp = status.timestamp;
            state.active.messages.push(status);
            self.render_locked(&state);
            timestamp
        };

        let content = source.content_for_summary().await;

        let mut state = self.lock().await;
        remove_transient_at(&mut state.active, status);

        match content {
            Ok(text) if text.trim().is_empty() => {
                let request = self.user_message(notices::SUMMARY_REQUEST_CURRENT_PAGE);
                self.push_locked(&mut state, request).await?;
                let empty = self.model_message(notices::PAGE_CONTENT_EMPTY);
                self.push_locked(&mut state, empty).await?;
                self.render_locked(&state);
                Ok(())
            }
            Ok(text) => {
                let request = self.user_message(format!(
                    "{} (Content length: {})",
                    notices::SUMMARY_REQUEST_CURRENT_PAGE,
                    text.chars().count()
                ));
                let displayed_at = request.timestamp;
                self.push_locked(&mut state, request).await?;
                self.render_locked(&state);
                let prompt = summarize_prompt(&state.summarize_body(), &text);
                drop(state);
                self.ask(&turn_lock, prompt, None, Some(displayed_at)).await
            }
            Err(message) => {
                tracing::warn!(error = %message, "Page content unavailable for summary");
                let request = self.user_message(notices::SUMMARY_REQUEST_CURRENT_PAGE);
                self.push_locked(&mut state, request).await?;
                let error = self.model_message(notices::summary_error(&message));
                self.push_locked(&mut state, error).await?;
                self.render_locked(&state);
                Ok(())
            }
        }
    }

    /// Wait for the previous turn to finish. Hold the guard from appending
    /// the question until the reply is folded in.
    pub(crate) async fn begin_turn(&self) -> MutexGuard<'_, ()> {
        self.inner.in_flight.lock().await
    }

    /// Send `text` with the summarize template.
    pub(crate) async fn ask_summary(
        &self,
        turn_lock: &MutexGuard<'_, ()>,
        text: &str,
        displayed_at: i64,
    ) -> SessionResult<()> {
        let prompt = {
            let state = self.lock().await;
            summarize_prompt(&state.summarize_body(), text)
        };
        self.ask(turn_lock, prompt, None, Some(displayed_at)).await
    }

    /// One provider round trip. The caller holds the turn lock.
    async fn ask(
        &self,
        _turn_lock: &MutexGuard<'_, ()>,
        prompt: String,
        image: Option<String>,
        displayed_at: Option<i64>,
    ) -> SessionResult<()> {
        let (config, prior, placeholder) = {
            let mut state = self.lock().await;
            let Some(config) = state.provider.clone() else {
                let text = config_error_text(state.provider_error.clone());
                state.input_enabled = false;
                self.push_error_locked(&mut state, text).await?;
                self.render_locked(&state);
                return Ok(());
            };
            let thinking = self.model_message(notices::THINKING).into_transient();
            let placeholder = thinking.timestamp;
            state.active.messages.push(thinking);
            self.render_locked(&state);
            (config, state.active.messages.clone(), placeholder)
        };

        let mut turn = NewTurn::text(prompt);
        if let Some(locator) = image {
            turn = turn.with_image(locator);
        }
        if let Some(timestamp) = displayed_at {
            turn = turn.displayed_at(timestamp);
        }

        let result = self
            .inner
            .client
            .complete(&config, &prior, &turn, placeholder)
            .await;

        let mut state = self.lock().await;
        remove_transient_at(&mut state.active, placeholder);

        let reply = match result {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(
                    session_id = %state.active.id,
                    provider = %config.provider_kind,
                    error = %e,
                    "Provider call failed"
                );
                if e.is_config() {
                    state.input_enabled = false;
                }
                self.model_message(e.user_message())
            }
        };
        self.push_locked(&mut state, reply).await?;
        self.render_locked(&state);
        Ok(())
    }

    /// Append a message to the active session, persisting it unless transient.
    pub async fn push_message(&self, message: Message) -> SessionResult<()> {
        let mut state = self.lock().await;
        self.push_locked(&mut state, message).await?;
        self.render_locked(&state);
        Ok(())
    }

    /// Show a transient status that stays until removed.
    pub async fn push_status(&self, text: impl Into<String>) -> i64 {
        let mut state = self.lock().await;
        let status = self.model_message(text).into_transient();
        let timestamp = status.timestamp;
        state.active.messages.push(status);
        self.render_locked(&state);
        timestamp
    }

    /// Show a transient notice that removes itself after the notice TTL.
    pub async fn push_notice(&self, text: impl Into<String>) {
        let mut state = self.lock().await;
        self.push_notice_locked(&mut state, text);
        self.render_locked(&state);
    }

    /// Remove matching messages from the active session. Returns how many
    /// were removed.
    pub async fn remove_where<F>(&self, predicate: F) -> SessionResult<usize>
    where
        F: Fn(&Message) -> bool + Send,
    {
        let mut state = self.lock().await;
        let before = state.active.messages.len();
        let durable_before = state.active.messages.iter().filter(|m| !m.transient).count();
        state.active.messages.retain(|m| !predicate(m));
        let removed = before - state.active.messages.len();
        if removed == 0 {
            return Ok(0);
        }

        let durable_after = state.active.messages.iter().filter(|m| !m.transient).count();
        if durable_after != durable_before {
            self.persist_active(&mut state).await?;
        }
        self.render_locked(&state);
        Ok(removed)
    }

    /// Empty History and start a new active session.
    pub async fn clear_history(&self) -> SessionResult<()> {
        let mut state = self.lock().await;
        self.write_list(&mut state, ListTarget::History, |list| list.clear())
            .await?;
        state.active = Session::new();
        tracing::info!(session_id = %state.active.id, "History cleared");
        self.push_notice_locked(&mut state, notices::ALL_HISTORY_CLEARED);
        self.render_locked(&state);
        Ok(())
    }

    pub async fn delete_history_entry(&self, id: SessionId) -> SessionResult<()> {
        self.delete_entry(ListTarget::History, id).await
    }

    pub async fn delete_archive_entry(&self, id: SessionId) -> SessionResult<()> {
        self.delete_entry(ListTarget::Archive, id).await
    }

    async fn delete_entry(&self, target: ListTarget, id: SessionId) -> SessionResult<()> {
        let mut state = self.lock().await;
        let (list, _) = state.list_mut(target);
        if !list.iter().any(|s| s.id == id) {
            return Err(SessionError::NotFound(id));
        }
        self.write_list(&mut state, target, |list| list.retain(|s| s.id != id))
            .await?;
        tracing::info!(session_id = %id, key = target.key(), "Entry deleted");
        self.render_locked(&state);
        Ok(())
    }

    /// Load a History entry into the active buffer.
    pub async fn resume(&self, id: SessionId) -> SessionResult<()> {
        let mut state = self.lock().await;
        let entry = state
            .history
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or(SessionError::NotFound(id))?;
        state.active = entry;
        self.render_locked(&state);
        Ok(())
    }

    pub async fn snapshot(&self) -> SyncSnapshot {
        self.lock().await.snapshot()
    }

    pub async fn archive(&self) -> Vec<Session> {
        self.lock().await.archive.clone()
    }

    pub async fn active(&self) -> Session {
        self.lock().await.active.clone()
    }

    pub fn user_message(&self, text: impl Into<String>) -> Message {
        Message::user(text, self.inner.clock.now_ms())
    }

    pub fn model_message(&self, text: impl Into<String>) -> Message {
        Message::model(text, self.inner.clock.now_ms())
    }

    pub(crate) async fn lock(&self) -> MutexGuard<'_, SyncState> {
        self.inner.state.lock().await
    }

    pub(crate) fn render_locked(&self, state: &SyncState) {
        self.inner.render.render(&state.snapshot());
    }

    pub(crate) async fn push_locked(
        &self,
        state: &mut SyncState,
        message: Message,
    ) -> Result<(), StoreError> {
        let transient = message.transient;
        state.active.messages.push(message);
        if transient {
            return Ok(());
        }
        self.persist_active(state).await
    }

    /// Push a durable error unless it is already the last durable message.
    async fn push_error_locked(&self, state: &mut SyncState, text: String) -> Result<(), StoreError> {
        let repeated = state
            .active
            .messages
            .iter()
            .rev()
            .find(|m| !m.transient)
            .is_some_and(|m| m.is_model() && m.text() == text);
        if repeated {
            return Ok(());
        }
        let message = self.model_message(text);
        self.push_locked(state, message).await
    }

    pub(crate) fn push_notice_locked(&self, state: &mut SyncState, text: impl Into<String>) {
        let notice = self.model_message(text).into_transient();
        let timestamp = notice.timestamp;
        state.active.messages.push(notice);

        let sync = self.clone();
        let ttl = self.inner.notice_ttl;
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            if let Err(e) = sync
                .remove_where(move |m| m.transient && m.timestamp == timestamp)
                .await
            {
                tracing::warn!(error = %e, "Failed to expire notice");
            }
        });
    }

    /// Upsert the active session's durable projection into History.
    pub(crate) async fn persist_active(&self, state: &mut SyncState) -> Result<(), StoreError> {
        let active = state.active.clone();
        let policy = self.inner.policy;
        self.write_list(state, ListTarget::History, move |list| {
            policy.upsert(list, &active);
        })
        .await
    }

    /// Apply `mutate` to a list mirror and commit it at the last-seen version.
    ///
    /// On a stale version the mirror is reloaded and the mutation re-applied.
    pub(crate) async fn write_list<F>(
        &self,
        state: &mut SyncState,
        target: ListTarget,
        mut mutate: F,
    ) -> Result<(), StoreError>
    where
        F: FnMut(&mut Vec<Session>) + Send,
    {
        let key = target.key();
        let mut attempt = 1;
        loop {
            let (list, version) = state.list_mut(target);
            mutate(&mut *list);
            let options = self.write_options().expecting(*version);
            match self.inner.store.save(key, &*list, options).await {
                Ok(committed) => {
                    tracing::debug!(key, version = committed, len = list.len(), "Committed list");
                    *version = committed;
                    return Ok(());
                }
                Err(e) if e.is_stale() && attempt < MAX_WRITE_ATTEMPTS => {
                    tracing::warn!(key, attempt, error = %e, "Stale write; reloading and retrying");
                    let (fresh, current) =
                        self.inner.store.load_or_default::<Vec<Session>>(key).await?;
                    *list = fresh;
                    *version = current;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn write_options(&self) -> WriteOptions {
        WriteOptions::new(self.inner.origin.as_str())
    }

    async fn load_provider(&self, state: &mut SyncState) -> ProviderStatus {
        let store = &self.inner.store;
        let configs = match store
            .load_or_default::<Vec<ProviderConfig>>(keys::PROVIDER_CONFIGS)
            .await
        {
            Ok((configs, version)) => {
                state.configs_version = version;
                configs
            }
            Err(e) => return ProviderStatus::LoadFailed(e),
        };
        let active_id = match store.load::<String>(keys::ACTIVE_PROVIDER_CONFIG_ID).await {
            Ok(found) => found.map(|(id, version)| {
                state.active_id_version = version;
                id
            }),
            Err(e) => return ProviderStatus::LoadFailed(e),
        };

        match ProviderConfig::resolve_active(&configs, active_id.as_deref()) {
            Ok(config) => match config.validate() {
                Ok(()) => ProviderStatus::Ready(config.clone()),
                Err(e) => ProviderStatus::Incomplete(config.clone(), e),
            },
            Err(_) => ProviderStatus::Missing,
        }
    }

    async fn apply_provider_status(
        &self,
        state: &mut SyncState,
        status: ProviderStatus,
        initial: bool,
    ) -> Result<(), StoreError> {
        let error = match status {
            ProviderStatus::Ready(config) => {
                tracing::info!(
                    config_id = %config.id,
                    provider = %config.provider_kind,
                    model = %config.model_name,
                    "Provider configuration active"
                );
                let kind = config.provider_kind.as_str();
                let text = if initial {
                    notices::config_loaded(&config.display_name, kind)
                } else {
                    notices::config_switched(&config.display_name, kind)
                };
                state.provider = Some(config);
                state.provider_error = None;
                state.input_enabled = true;
                if initial {
                    self.push_notice_locked(state, text);
                } else {
                    let message = self.model_message(text);
                    self.push_locked(state, message).await?;
                }
                return Ok(());
            }
            ProviderStatus::Incomplete(config, e) => {
                tracing::warn!(config_id = %config.id, error = %e, "Active provider configuration is incomplete");
                state.provider_error = Some(e);
                if !initial {
                    state.provider = None;
                    state.input_enabled = false;
                    self.push_error_locked(state, notices::NEW_CONFIG_INCOMPLETE.to_string())
                        .await?;
                    let switched = notices::config_switched(
                        &config.display_name,
                        config.provider_kind.as_str(),
                    );
                    let message = self.model_message(switched);
                    return self.push_locked(state, message).await;
                }
                notices::CONFIG_INCOMPLETE
            }
            ProviderStatus::Missing => {
                tracing::warn!("No provider configuration");
                state.provider_error = Some(ConfigError::NoConfiguration);
                if initial {
                    notices::CONFIG_MISSING
                } else {
                    notices::NO_ACTIVE_CONFIG
                }
            }
            ProviderStatus::LoadFailed(e) => {
                tracing::error!(error = %e, "Failed to load provider configuration");
                state.provider_error = None;
                notices::CONFIG_LOAD_FAILED
            }
        };

        state.provider = None;
        state.input_enabled = false;
        self.push_error_locked(state, error.to_string()).await
    }
}

fn config_error_text(error: Option<ConfigError>) -> String {
    error
        .map(|e| ChatError::from(e).user_message())
        .unwrap_or_else(|| notices::CONFIG_LOAD_FAILED.to_string())
}

fn remove_transient_at(session: &mut Session, timestamp: i64) {
    session
        .messages
        .retain(|m| !(m.transient && m.timestamp == timestamp));
}

fn decode_or_default<T>(change: &StoreChange) -> Result<T, StoreError>
where
    T: DeserializeOwned + Default,
{
    match &change.new {
        None => Ok(T::default()),
        Some(value) => {
            serde_json::from_value(value.clone()).map_err(|e| StoreError::Serialization {
                key: change.key.clone(),
                message: e.to_string(),
            })
        }
    }
}
