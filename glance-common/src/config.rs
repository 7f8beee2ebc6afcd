//! Configuration for Glance.
//!
//! Loaded from `~/.glance/config.json`. Every field has a default, so a
//! missing file or a partial file is fine. Environment variables override
//! the file:
//!
//! | Variable | Field |
//! |----------|-------|
//! | `GLANCE_LOG_LEVEL` | `observability.log_level` |
//! | `GLANCE_LOG_FORMAT` | `observability.log_format` |
//! | `GLANCE_STORE_PATH` | `store.path` |
//! | `GLANCE_HISTORY_CAP` | `history.cap` |
//! | `GLANCE_EXTRACT_TIMEOUT_SECS` | `extraction.timeout_secs` |

use crate::error::{Error, Result, ResultExt};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".glance"),
        |dirs| dirs.home_dir().join(".glance"),
    )
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

// ============================================================================
// Sections
// ============================================================================

/// Which store backend to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Sqlite,
    Memory,
}

/// Persistent store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite database file.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,

    #[serde(default)]
    pub backend: StoreBackend,
}

fn default_store_path() -> PathBuf {
    config_dir().join("store.db")
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            backend: StoreBackend::default(),
        }
    }
}

/// How a session is matched against existing History entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertKeyPolicy {
    /// Match on the explicit session id.
    #[default]
    SessionId,
    /// Match on the first message's timestamp.
    FirstMessageTimestamp,
}

/// Session history configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Maximum number of sessions kept in History.
    #[serde(default = "default_history_cap")]
    pub cap: usize,

    #[serde(default)]
    pub upsert_key: UpsertKeyPolicy,
}

fn default_history_cap() -> usize {
    50
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            cap: default_history_cap(),
            upsert_key: UpsertKeyPolicy::default(),
        }
    }
}

/// Self-expiring notices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoticeConfig {
    #[serde(default = "default_notice_ttl_ms")]
    pub ttl_ms: u64,
}

fn default_notice_ttl_ms() -> u64 {
    3000
}

impl Default for NoticeConfig {
    fn default() -> Self {
        Self {
            ttl_ms: default_notice_ttl_ms(),
        }
    }
}

impl NoticeConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }
}

/// External page extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// How long to wait for the ephemeral tab to finish loading.
    #[serde(default = "default_extract_timeout")]
    pub timeout_secs: u64,

    /// Article text shorter than this falls back to raw page text.
    #[serde(default = "default_min_article_chars")]
    pub min_article_chars: usize,
}

fn default_extract_timeout() -> u64 {
    20
}

fn default_min_article_chars() -> usize {
    100
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_extract_timeout(),
            min_article_chars: default_min_article_chars(),
        }
    }
}

impl ExtractionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Outbound HTTP (provider calls, image fetches).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_http_timeout() -> u64 {
    120
}

fn default_connect_timeout() -> u64 {
    10
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_http_timeout(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// "pretty" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

// ============================================================================
// Root
// ============================================================================

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub history: HistoryConfig,

    #[serde(default)]
    pub notices: NoticeConfig,

    #[serde(default)]
    pub extraction: ExtractionConfig,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from the default path.
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            tracing::info!("Config file not found, using defaults");
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .context(format!("Failed to read config from {}", path.display()))?;

        serde_json::from_str::<Self>(&content)
            .context(format!("Failed to parse config from {}", path.display()))
    }

    /// Load configuration with environment variable overrides, then validate.
    pub fn load_with_env() -> Result<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(level) = var("GLANCE_LOG_LEVEL") {
            self.observability.log_level = level;
        }
        if let Some(format) = var("GLANCE_LOG_FORMAT") {
            self.observability.log_format = format;
        }
        if let Some(path) = var("GLANCE_STORE_PATH") {
            self.store.path = PathBuf::from(path);
        }
        if let Some(cap) = var("GLANCE_HISTORY_CAP").and_then(|v| v.parse().ok()) {
            self.history.cap = cap;
        }
        if let Some(secs) = var("GLANCE_EXTRACT_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.extraction.timeout_secs = secs;
        }
    }

    /// Save configuration to the default path.
    pub fn save(&self) -> Result<()> {
        let dir = config_dir();
        if !dir.exists() {
            fs::create_dir_all(&dir)
                .context(format!("Failed to create config directory {}", dir.display()))?;
        }
        self.save_to(&config_path())
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).context(format!("Failed to write config to {}", path.display()))
    }

    /// Validate the entire configuration.
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        let mut errors = Vec::new();

        let positive: [(&str, u64); 5] = [
            ("history.cap", self.history.cap as u64),
            ("notices.ttl_ms", self.notices.ttl_ms),
            ("extraction.timeout_secs", self.extraction.timeout_secs),
            ("http.timeout_secs", self.http.timeout_secs),
            ("http.connect_timeout_secs", self.http.connect_timeout_secs),
        ];
        for (field, value) in positive {
            if value == 0 {
                errors.push(ValidationError::InvalidValue {
                    field: field.to_string(),
                    reason: "must be greater than zero".into(),
                });
            }
        }

        if !matches!(self.observability.log_format.as_str(), "pretty" | "json") {
            errors.push(ValidationError::InvalidValue {
                field: "observability.log_format".into(),
                reason: format!("expected 'pretty' or 'json', got '{}'", self.observability.log_format),
            });
        }

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(ValidationError::Multiple(errors)),
        }
    }
}

/// Configuration validation error.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Multiple validation errors: {0:?}")]
    Multiple(Vec<ValidationError>),
}

impl From<ValidationError> for Error {
    fn from(e: ValidationError) -> Self {
        Error::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.history.cap, 50);
        assert_eq!(config.history.upsert_key, UpsertKeyPolicy::SessionId);
        assert_eq!(config.notices.ttl(), Duration::from_secs(3));
        assert_eq!(config.extraction.timeout(), Duration::from_secs(20));
        assert_eq!(config.store.backend, StoreBackend::Sqlite);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"history": {"cap": 10, "upsert_key": "first_message_timestamp"}}"#)
                .unwrap();
        assert_eq!(config.history.cap, 10);
        assert_eq!(config.history.upsert_key, UpsertKeyPolicy::FirstMessageTimestamp);
        assert_eq!(config.http.timeout_secs, 120);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = Config::default();
        config.store.backend = StoreBackend::Memory;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.store.backend, StoreBackend::Memory);
    }

    #[test]
    fn test_load_errors_carry_path_context() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        let err = Config::load_from(&missing).unwrap_err();
        assert!(err.to_string().starts_with("Failed to read config from"));
        assert!(matches!(err.root(), Error::Io(_)));

        let broken = dir.path().join("broken.json");
        fs::write(&broken, "{ not json").unwrap();
        let err = Config::load_from(&broken).unwrap_err();
        assert!(err.to_string().starts_with("Failed to parse config from"));
        assert!(matches!(err.root(), Error::Json(_)));
    }

    #[test]
    fn test_validation_error_is_config_error() {
        let mut config = Config::default();
        config.notices.ttl_ms = 0;
        let err: Error = config.validate().unwrap_err().into();
        assert!(matches!(err, Error::Config(ref m) if m.contains("notices.ttl_ms")));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("GLANCE_LOG_LEVEL", "debug"),
            ("GLANCE_HISTORY_CAP", "7"),
            ("GLANCE_EXTRACT_TIMEOUT_SECS", "not-a-number"),
            ("GLANCE_STORE_PATH", "/tmp/glance.db"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(config.observability.log_level, "debug");
        assert_eq!(config.history.cap, 7);
        assert_eq!(config.extraction.timeout_secs, 20);
        assert_eq!(config.store.path, PathBuf::from("/tmp/glance.db"));
    }

    #[test]
    fn test_validate_rejects_zeroes() {
        let mut config = Config::default();
        config.history.cap = 0;
        assert!(matches!(config.validate(), Err(ValidationError::InvalidValue { .. })));

        config.extraction.timeout_secs = 0;
        config.observability.log_format = "xml".into();
        match config.validate() {
            Err(ValidationError::Multiple(errors)) => assert_eq!(errors.len(), 3),
            other => panic!("expected multiple errors, got {:?}", other),
        }
    }
}
