//! Glance Session - the conversation state each context keeps in sync.
//!
//! This crate provides:
//! - [`SessionSync`], the per-context synchronizer over the shared store
//! - The History upsert policy and its capped list
//! - Q&A pair and whole-session archival
//! - Builtin prompt templates and the turn composer
//! - [`SidebarInbox`], which turns link-summary events into messages

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod archive;
pub mod compose;
pub mod error;
pub mod history;
pub mod inbox;
pub mod render;
pub mod sync;
pub mod templates;

pub use archive::find_question;
pub use compose::{compose, summarize_prompt, ComposeError, ComposedTurn};
pub use error::{ArchiveError, SessionError, SessionResult};
pub use history::{HistoryPolicy, ReconciliationAnomaly, UpsertAction, UpsertOutcome};
pub use inbox::SidebarInbox;
pub use render::{LatestFrame, NullRender, RenderSink, SyncSnapshot};
pub use sync::{ListTarget, PageSource, SessionSync, UserInput};
