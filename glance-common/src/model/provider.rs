//! Provider configurations.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Which wire protocol a provider speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Gemini `generateContent`.
    #[default]
    Gemini,
    /// OpenAI-compatible `chat/completions`.
    #[serde(alias = "openai-compatible")]
    OpenAi,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::OpenAi => "openai",
        }
    }

    /// Human-facing provider name used in error messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Gemini => "Gemini",
            Self::OpenAi => "OpenAI",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gemini" | "a" => Ok(Self::Gemini),
            "openai" | "openai-compatible" | "b" => Ok(Self::OpenAi),
            other => Err(format!("unknown provider kind '{}'", other)),
        }
    }
}

/// Why a provider configuration cannot be used.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("API key is missing")]
    MissingCredential,

    #[error("model name is missing")]
    MissingModel,

    #[error("endpoint is required for OpenAI-compatible providers")]
    MissingEndpoint,

    #[error("no API configuration found")]
    NoConfiguration,
}

/// One saved provider configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    pub id: String,
    #[serde(alias = "configName")]
    pub display_name: String,
    #[serde(alias = "apiType")]
    pub provider_kind: ProviderKind,
    #[serde(alias = "apiKey")]
    pub credential: String,
    /// Required for OpenAI-compatible providers; an optional base URL override for Gemini.
    #[serde(default, alias = "apiEndpoint")]
    pub endpoint: String,
    pub model_name: String,
}

impl ProviderConfig {
    pub fn new(
        display_name: impl Into<String>,
        provider_kind: ProviderKind,
        credential: impl Into<String>,
        model_name: impl Into<String>,
    ) -> Self {
        Self {
            id: format!("config-{}", Uuid::new_v4()),
            display_name: display_name.into(),
            provider_kind,
            credential: credential.into(),
            endpoint: String::new(),
            model_name: model_name.into(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Check that every field the provider needs is present.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.credential.trim().is_empty() {
            return Err(ConfigError::MissingCredential);
        }
        if self.model_name.trim().is_empty() {
            return Err(ConfigError::MissingModel);
        }
        if self.provider_kind == ProviderKind::OpenAi && self.endpoint.trim().is_empty() {
            return Err(ConfigError::MissingEndpoint);
        }
        Ok(())
    }

    /// Pick the configuration named by `active_id`, falling back to the first.
    pub fn resolve_active<'a>(
        configs: &'a [ProviderConfig],
        active_id: Option<&str>,
    ) -> Result<&'a ProviderConfig, ConfigError> {
        let by_id = active_id.and_then(|id| configs.iter().find(|c| c.id == id));
        if by_id.is_none() && active_id.is_some() && !configs.is_empty() {
            tracing::warn!(
                active_id = ?active_id,
                "Active configuration not found; defaulting to the first one"
            );
        }
        by_id.or_else(|| configs.first()).ok_or(ConfigError::NoConfiguration)
    }
}
