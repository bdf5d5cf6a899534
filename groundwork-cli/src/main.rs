//! groundwork - service bootstrap
//!
//! Loads settings from the environment (and an optional `.env` file), brings
//! up the relational and cache connection managers, and serves the HTTP
//! surface until Ctrl+C or SIGTERM.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use groundwork_core::{load_dotenv, Settings};
use groundwork_server::{run_server, AppState};
use tracing::info;

mod tracing_setup;

#[derive(Parser, Debug)]
#[command(
    name = "groundwork",
    author,
    version,
    about = "Service bootstrap: settings, connection lifecycle and HTTP surface",
    long_about = "Reads nested settings from the environment (e.g. POSTGRES__PASSWORD), \
                  initializes the relational and cache pools, and serves health endpoints \
                  with graceful shutdown."
)]
struct Cli {
    /// Load variables from this .env file instead of searching for one
    #[arg(long, env = "GROUNDWORK_ENV_FILE", value_name = "PATH")]
    env_file: Option<PathBuf>,

    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(long)]
    debug: bool,

    /// Validate configuration and exit without connecting to anything
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    if let Err(err) = tracing_setup::init(&tracing_setup::TracingConfig { debug: cli.debug }) {
        eprintln!("warning: tracing not initialized: {err}");
    }

    load_dotenv(cli.env_file.as_deref()).context("Failed to load .env file")?;
    let settings = Settings::load().context("Failed to load settings")?;

    if cli.check {
        let addr = settings.bind_addr().context("Failed to load settings")?;
        println!("Configuration OK (bind address {addr})");
        return Ok(());
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        bind = %settings.host,
        port = settings.port,
        "Starting groundwork"
    );

    let state = AppState::new(settings);
    run_server(state).await.context("Server error")?;

    Ok(())
}
