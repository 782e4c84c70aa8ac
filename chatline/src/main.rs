//! Chatline - Main entry point.

use anyhow::Result;
use chatline::start_server;
use chatline_common::config::{config_path, Config};
use chatline_common::logging::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration (file, then environment)
    let config = Config::load_with_env()?;

    // Initialize logging
    init_logging(
        &config.observability.log_level,
        &config.observability.log_format,
    );

    tracing::info!("Chatline v{}", env!("CARGO_PKG_VERSION"));

    let path = config_path();
    if path.exists() {
        tracing::info!("Loaded config from {}", path.display());
    } else {
        tracing::info!("Config file not found, using defaults");
    }

    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {e}"))?;

    for name in config.missing_credentials() {
        tracing::warn!("{} not set", name);
    }

    // Start the HTTP server
    start_server(&config).await
}
