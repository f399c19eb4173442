//! Shared request plumbing for Ember crates

mod context;
mod error;

pub use context::RequestContext;
pub use error::HttpError;
