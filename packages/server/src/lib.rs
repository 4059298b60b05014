//! OrderTree HTTP server
//!
//! Exposes the ordered tree store as a small JSON API. Handlers translate
//! requests into `TreeStore` calls and map `MutationOutcome` and
//! `StoreError` to HTTP statuses through [`HttpError`].
//!
//! # Usage
//!
//! ```bash
//! ORDERTREE_PORT=8080 RUST_LOG=debug cargo run --bin ordertree-server
//! ```

use axum::Router;
use ordertree_core::TreeStore;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod config;
mod http_error;
mod node_endpoints;

pub use config::ServerConfig;
pub use http_error::HttpError;

/// Application state shared across all endpoints
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TreeStore>,
}

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(node_endpoints::routes(state))
        .layer(TraceLayer::new_for_http())
}

/// Serve `store` on `config.bind_addr()` until Ctrl-C
///
/// # Errors
///
/// Returns error if server fails to bind or start.
pub async fn start_server(store: Arc<dyn TreeStore>, config: &ServerConfig) -> anyhow::Result<()> {
    let app = create_router(AppState { store });

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("OrderTree server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
