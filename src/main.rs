mod api;
mod bootstrap;
mod chain;
mod config;
mod error;
mod extractor;
mod ledger;
mod middleware;
mod reconciliation;
mod server;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

// Initialize logging and tracing
fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,tower_http=debug,custody_watcher=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    info!("🚀 Starting custody deposit watcher");

    // Load configuration
    let config = Config::from_env()?;

    let app = bootstrap::initialize_app(&config).await?;

    // Background scanning
    let _watcher = app.scheduler.start();

    // Create HTTP server
    let router = server::create_app(app.state, &config.cors_origins());

    // Run the Server
    server::run_server(router, &config.bind_address).await?;

    Ok(())
}
