/// Server setup and initialization
///
/// Wires together the storage backend, the metadata stores and the HTTP routes.

use crate::{
    api::{create_event_routes, create_metadata_routes, AppState},
    config::Config,
    metadata::MetadataStores,
    storage::{open_backend, ColumnStore},
};
use anyhow::Result;
use axum::{routing::get, Router};
use std::sync::Arc;
use tokio::net::TcpListener;

/// Build the router over an already opened backend
pub fn create_router(backend: Arc<dyn ColumnStore>, config: &Config) -> Router {
    let stores = MetadataStores::new(backend, &config.storage.tables);
    let app_state = AppState { stores };

    Router::new()
        // Health check endpoint
        .route("/healthz", get(health_check))
        .merge(create_metadata_routes())
        .merge(create_event_routes())
        .with_state(app_state)
}

/// Create the main Axum application with all routes
pub async fn create_app(config: &Config) -> Result<Router> {
    tracing::info!("🗄️ Opening {:?} storage backend", config.storage.backend);
    let backend = open_backend(&config.storage)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to open storage backend: {}", e))?;

    if !backend.supports_conditional_writes() {
        tracing::warn!("Backend has no conditional writes; concurrent creates of one version may both succeed");
    }

    let app = create_router(backend, config);
    tracing::info!("✅ Application initialized successfully");
    Ok(app)
}

/// Start the HTTP server with the given configuration
pub async fn start_server(config: Config) -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .init();

    tracing::info!("Starting metadata server...");

    let app = create_app(&config).await?;

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&bind_addr).await?;

    tracing::info!("Server listening on http://{}", bind_addr);

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

/// Health check endpoint handler
async fn health_check() -> &'static str {
    "ok"
}
