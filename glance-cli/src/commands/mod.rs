pub mod archive;
pub mod chat;
pub mod config;
pub mod history;
pub mod summarize;
pub mod templates;

use anyhow::{Context, Result};
use glance_common::SessionId;

pub(crate) fn parse_id(id: &str) -> Result<SessionId> {
    id.parse()
        .with_context(|| format!("'{}' is not a valid session id", id))
}
