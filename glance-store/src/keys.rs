//! Well-known store keys.

/// Capped list of past sessions, most recent first.
pub const SESSION_HISTORY: &str = "sessionHistory";
/// Explicitly saved sessions and Q&A pairs.
pub const ARCHIVE_STORE: &str = "archiveStore";
pub const PROMPT_TEMPLATES: &str = "promptTemplates";
pub const PROVIDER_CONFIGS: &str = "providerConfigs";
pub const ACTIVE_PROVIDER_CONFIG_ID: &str = "activeProviderConfigId";

// UI preferences; stored for the sidebar, not read by the core.
pub const SIDEBAR_WIDTH: &str = "sidebarWidth";
pub const LANGUAGE: &str = "language";

/// Keys whose changes affect the active provider configuration.
pub fn is_provider_key(key: &str) -> bool {
    key == PROVIDER_CONFIGS || key == ACTIVE_PROVIDER_CONFIG_ID
}
