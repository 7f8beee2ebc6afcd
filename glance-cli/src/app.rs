//! Wiring the store, provider client and synchronizer for one invocation.

use glance_common::config::{Config, StoreBackend};
use glance_common::error::{Result, ResultExt};
use glance_common::{Clock, MonotonicClock};
use glance_provider::{ChatClient, HttpImageFetcher, HttpTransport};
use glance_session::{NullRender, SessionSync};
use glance_store::{MemoryStore, SqliteStore, Store};
use std::sync::Arc;

/// Origin recorded on every write this binary makes.
pub const ORIGIN: &str = "cli";

pub struct App {
    pub config: Config,
    pub store: Arc<dyn Store>,
}

impl App {
    pub fn open(config: Config) -> Result<Self> {
        let store: Arc<dyn Store> = match config.store.backend {
            StoreBackend::Sqlite => Arc::new(
                SqliteStore::open(&config.store.path)
                    .context(format!("Failed to open store at {}", config.store.path.display()))?,
            ),
            StoreBackend::Memory => {
                tracing::warn!("Using the in-memory store; nothing will be saved");
                Arc::new(MemoryStore::new())
            }
        };
        Ok(Self { config, store })
    }

    /// An initialized synchronizer for this process.
    pub async fn sync(&self) -> Result<SessionSync> {
        let clock: Arc<dyn Clock> = Arc::new(MonotonicClock::system());
        let client = ChatClient::new(
            Arc::new(HttpTransport::new(&self.config.http)),
            Arc::new(HttpImageFetcher::new(&self.config.http)),
            clock.clone(),
        );
        let sync = SessionSync::new(
            ORIGIN,
            self.store.clone(),
            client,
            clock,
            Arc::new(NullRender),
            &self.config,
        );
        sync.init().await.context("Failed to load session state")?;
        Ok(sync)
    }
}
