//! Glance Common - Shared types, configuration and plumbing for the Glance workspace.
//!
//! This crate provides:
//! - The conversation data model (messages, sessions, provider configs, prompt templates)
//! - Configuration types and loading
//! - Error types and handling utilities
//! - Logging setup
//! - The cross-context message bus
//! - Time sources for message timestamps
//! - Small text utilities used across crates

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod bus;
pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod notices;
pub mod util;

pub use bus::{BusError, BusResult, Event, EventBus, EventReceiver, InMemoryBus};
pub use clock::{Clock, ManualClock, MonotonicClock, SystemClock};
pub use config::{Config, UpsertKeyPolicy};
pub use error::{Error, Result};
pub use model::{
    ConfigError, InlineImage, Message, MessageError, Part, PromptTemplate, ProviderConfig,
    ProviderKind, Role, Session, SessionId,
};

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::logging::init_logging;
    pub use crate::model::{Message, Part, Role, Session, SessionId};
}
