//! VoteHub server binary.

use clap::Parser;
use tracing_subscriber::EnvFilter;
use votehub::config::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse();

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("votehub=info"));
    if config.json_logs {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        port = config.port,
        mode = ?config.mode,
        "VoteHub starting"
    );

    votehub::server::run_server(config).await?;
    Ok(())
}
