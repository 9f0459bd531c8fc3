//! Binary crate for the `weather-server` tool.
//!
//! This crate focuses on:
//! - Parsing CLI arguments
//! - Logging setup
//! - Interactive configuration and one-shot lookups

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

mod cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let cmd = cli::Cli::parse();
    cmd.run().await
}
