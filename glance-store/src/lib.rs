//! Glance Store - durable key-value storage shared by every execution context.
//!
//! Each key holds one JSON document and a monotonic version counter. Writes
//! are last-writer-wins unless they name an expected version, in which case a
//! stale write is rejected. Every committed write is broadcast as a
//! [`StoreChange`] to all subscribers, including the writer itself; receivers
//! filter on `origin`.
//!
//! Backends:
//! - [`MemoryStore`] for tests and ephemeral runs
//! - [`SqliteStore`] for durable storage

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod memory;
pub mod sqlite;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{Store, StoreChange, StoreExt, Versioned, WriteOptions};
