//! Glance Provider - one internal message model, two chat-completion protocols.
//!
//! A turn plus its prior conversation is translated into exactly one
//! [`WireRequest`] for the selected provider, executed through a
//! [`ChatTransport`], and the provider's reply is parsed back into a model
//! [`Message`](glance_common::Message).
//!
//! ```text
//! prior messages ─► history window ─┐
//!                                   ├─► wire::build ─► ChatTransport ─► wire::parse ─► Message
//! NewTurn ─► ImageFetcher/encode ───┘
//! ```
//!
//! Supported protocols:
//! - Gemini `generateContent`
//! - OpenAI-compatible `chat/completions`

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod client;
pub mod error;
pub mod image;
pub mod transport;
pub mod window;
pub mod wire;

pub use client::{ChatClient, NewTurn};
pub use error::{ChatError, ImageFetchError, TransportError};
pub use image::{encode_image, FetchedImage, HttpImageFetcher, ImageFetcher};
pub use transport::{ChatTransport, HttpTransport, WireRequest, WireResponse};
pub use window::history_window;
pub use wire::PreparedTurn;
