//! Brigade - restaurant POS sync client
//!
//! Headless entry point: wires the application context and runs until
//! interrupted.

use brigade_domain::Config;
use brigade_lib::AppContext;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging FIRST so we can see .env loading
    init_tracing();

    // Load environment variables from .env file
    match dotenvy::dotenv() {
        Ok(path) => info!(path = %path.display(), "Loaded .env"),
        Err(err) => debug!(error = %err, "No .env file loaded"),
    }

    let config = match brigade_infra::config::load() {
        Ok(config) => config,
        Err(err) => {
            warn!(error = %err, "No configuration found; using defaults");
            Config::default()
        }
    };

    info!(base_url = %config.api.base_url, "Brigade starting");
    let mut ctx = AppContext::init(config).await?;
    info!("Brigade initialized successfully");

    tokio::signal::ctrl_c().await?;
    info!("Interrupt received; shutting down");
    ctx.shutdown().await?;

    Ok(())
}
