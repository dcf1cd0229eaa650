//! qrcloud API Server
//!
//! Main entry point for the QR code generation and storage service.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use qrcloud_api::{AppState, create_router};
use qrcloud_core::retrieval::InMemoryResultStore;
use qrcloud_core::storage::{BackendConfig, BackendRegistry, StorageOptions};
use qrcloud_core::upload::CoordinatorConfig;
use qrcloud_shared::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "qrcloud=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;

    // Build the backend registry once; it never changes afterwards
    let options = StorageOptions::from_settings(&config.storage);
    let registry =
        BackendRegistry::build(BackendConfig::from_settings(&config.storage), &options).await;
    if registry.is_empty() {
        warn!("Starting in degraded mode: generated QR codes will not be stored");
    } else {
        info!(backends = ?registry.names(), "Storage backends registered");
    }

    // Create application state
    let store = InMemoryResultStore::new(
        config.storage.result_capacity,
        Duration::from_secs(config.storage.result_ttl_secs),
    );
    let state = AppState::new(
        Arc::new(registry),
        CoordinatorConfig::from_settings(&config.upload),
        store,
    );

    // Create router
    let app = create_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
