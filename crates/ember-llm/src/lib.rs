//! Model gateway core for Ember
//!
//! Accepts canonical chat requests, runs them through configurable
//! processors and dispatches them to `OpenAI`-compatible, Gemini or
//! text-completion backends, either as one JSON reply or a chunk stream.
//! [`ModelRegistry`] is the entry point; the optional `http` feature adds
//! the axum routes that expose it.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod convert;
pub mod error;
pub mod keys;
pub mod model;
pub mod processor;
pub mod protocol;
pub mod registry;
pub mod stream;
pub mod types;
pub mod weighted;

#[cfg(feature = "http")]
mod handler;
#[cfg(feature = "http")]
mod router;

pub use error::{ConfigError, LlmError};
pub use keys::{CredentialLease, KeyProvider};
pub use model::Model;
pub use processor::Processor;
pub use registry::ModelRegistry;
#[cfg(feature = "http")]
pub use router::llm_router;
pub use stream::ChunkStream;
pub use types::{ChatChunk, ChatRequest, ChatResponse, Message, Role};
