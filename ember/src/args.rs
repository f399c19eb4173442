use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

/// Ember model gateway
#[derive(Debug, Parser)]
#[command(name = "ember", about = "OpenAI-compatible gateway over heterogeneous LLM backends")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "ember.toml", env = "EMBER_CONFIG")]
    pub config: PathBuf,

    /// Override the listen address
    #[arg(long, env = "EMBER_LISTEN")]
    pub listen: Option<SocketAddr>,
}
