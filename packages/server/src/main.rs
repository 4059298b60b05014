//! OrderTree HTTP Server Binary
//!
//! # Environment Variables
//!
//! - `ORDERTREE_DB_PATH`: Database file (default: ./data/ordertree.db)
//! - `ORDERTREE_HOST` / `ORDERTREE_PORT`: Bind address (default: 127.0.0.1:8080)
//! - `ORDERTREE_REJECT_CYCLES`: Refuse moves under a descendant (default: true)
//! - `ORDERTREE_REJECT_DELETE_WITH_CHILDREN`: Refuse deleting parents (default: false)
//! - `RUST_LOG`: Logging level (e.g., "info", "debug", "trace")

use std::sync::Arc;

use ordertree_core::LibsqlTreeStore;
use ordertree_server::{start_server, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env();

    tracing::info!("Database: {}", config.database_path.display());
    tracing::info!(
        reject_cycles = config.reject_cycles,
        reject_delete_with_children = config.reject_delete_with_children,
        "Store checks"
    );

    let store = Arc::new(
        LibsqlTreeStore::open(config.database_path.clone(), config.store_config())
            .await
            .map_err(|e| anyhow::anyhow!("Failed to open store: {}", e))?,
    );

    start_server(store.clone(), &config).await?;

    store.close().await?;
    Ok(())
}
