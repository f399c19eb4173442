#![allow(clippy::must_use_candidate)]

mod duration;
mod env;
pub mod health;
pub mod keys;
pub mod llm;
mod loader;
pub mod processors;
pub mod server;
pub mod telemetry;

use serde::Deserialize;

pub use health::*;
pub use keys::*;
pub use llm::*;
pub use processors::*;
pub use server::*;
pub use telemetry::*;

/// Top-level Ember configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Logging configuration
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    /// Key providers, processors and model providers
    #[serde(default)]
    pub llm: LlmConfig,
}
