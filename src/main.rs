//! Home library server
//!
//! Loads the ledger from the configured store and serves the REST API.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use homelib_server::{
    api,
    config::AppConfig,
    ledger::Ledger,
    repository,
    services::{metadata::NoMetadata, Services},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("homelib_server={},tower_http=debug", config.logging.level).into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting home library server v{}", env!("CARGO_PKG_VERSION"));

    // Open the durable store and load the ledger once, before serving
    let store = repository::open_store(&config.storage)
        .await
        .context("Failed to open ledger store")?;
    tracing::info!("Opened {:?} store", config.storage.backend);

    let ledger = Ledger::open(store, config.library.strict_isbn)
        .await
        .context("Failed to load ledger")?;

    let services = Services::new(
        Arc::new(ledger),
        config.library.clone(),
        Arc::new(NoMetadata),
    );

    // Create application state
    let state = AppState {
        services: Arc::new(services),
    };

    // Build router
    let app = api::create_router(state);

    // Start server
    let addr = SocketAddr::new(
        config.server.host.parse().context("Invalid host address")?,
        config.server.port,
    );

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
