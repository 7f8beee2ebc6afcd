//! Glance Extract - load a link in an ephemeral tab and pull out its text.
//!
//! ```text
//! summarizeLinkTarget ─► LinkSummarizer ─► ExtractionPipeline ─► TabHost
//!                              ▲                   │
//!                              └── extractedLinkContent (by correlation id)
//! ```
//!
//! The pipeline opens a background tab, races page load against a timeout,
//! runs the readability extractor on the loaded page and closes the tab
//! exactly once whatever the outcome.

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

#[cfg(feature = "cdp")]
pub mod cdp;
pub mod error;
pub mod pipeline;
pub mod race;
pub mod readability;
pub mod tab;

#[cfg(feature = "cdp")]
pub use cdp::CdpTabHost;
pub use error::ExtractionError;
pub use pipeline::{Extracted, ExtractionPipeline, LinkSummarizer, Settlement};
pub use race::{RaceOutcome, RaceState};
pub use readability::{Article, ArticleExtractor, ReadabilityExtractor};
pub use tab::{PageSnapshot, TabGuard, TabHost, TabId};
