//! Conversation data model shared by every Glance component.

mod message;
mod provider;
mod session;
mod template;

pub use message::{InlineImage, Message, MessageError, Part, Role};
pub use provider::{ConfigError, ProviderConfig, ProviderKind};
pub use session::{Session, SessionId};
pub use template::{PromptTemplate, TEXT_PLACEHOLDER};
