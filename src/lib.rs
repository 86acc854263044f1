pub mod api;
pub mod config;
pub mod logic;
pub mod model;
pub mod seed;
pub mod store;

// Export API types
pub use api::routes::{build_app, create_router};

// Export the request pipeline
pub use logic::{
    AssociationWriter, BatchResolver, DedupPolicy, Outcome, RejectReason, RequestValidator,
    ServiceError,
};

// Export all model types
pub use model::*;

// Export store types
pub use store::{AssociationStore, MemoryStore, PictureStore, PostgresStore, RecordStore, Store};

use std::sync::Arc;
use tokio::net::TcpListener;

use crate::config::{AppConfig, StoreBackend};

/// Serve the API on an already bound listener until the server stops.
pub async fn serve<S: Store + 'static>(
    listener: TcpListener,
    store: Arc<S>,
    config: &AppConfig,
) -> anyhow::Result<()> {
    let app = build_app(store, config.associations.dedup);
    axum::serve(listener, app).await?;
    Ok(())
}

/// Build the configured store, optionally seed it, and serve.
pub async fn run_server(config: AppConfig, load_seed: bool) -> anyhow::Result<()> {
    let bind_address = config.server_address();
    let listener = TcpListener::bind(&bind_address).await?;
    log::info!("Media catalog listening on http://{}", bind_address);

    match config.database.backend {
        StoreBackend::Postgres => {
            let store =
                PostgresStore::new(&config.database_url(), config.max_connections()).await?;
            store.migrate().await?;
            start(listener, Arc::new(store), &config, load_seed).await
        }
        StoreBackend::Memory => {
            log::warn!("Using the in-memory store; data is lost on shutdown");
            start(listener, Arc::new(MemoryStore::new()), &config, load_seed).await
        }
    }
}

async fn start<S: Store + 'static>(
    listener: TcpListener,
    store: Arc<S>,
    config: &AppConfig,
    load_seed: bool,
) -> anyhow::Result<()> {
    if load_seed {
        log::info!("Loading seed data...");
        seed::load_seed_data(&*store).await?;
    }
    serve(listener, store, config).await
}
