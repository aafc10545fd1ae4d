//! # FreeCRM API Server
//!
//! ```bash
//! DATABASE_URL=postgresql://localhost/freecrm \
//! JWT_SECRET=$(openssl rand -hex 32) \
//! cargo run -p freecrm-api
//! ```

use std::sync::Arc;

use freecrm_api::{
    app::{build_router, AppState},
    config::Config,
};
use freecrm_shared::{
    db::{
        migrations::run_migrations,
        pool::{close_pool, create_pool, DatabaseConfig},
    },
    storage::local::LocalObjectStore,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "freecrm_api=debug,freecrm_shared=info,tower_http=debug".into());

    let json = std::env::var("LOG_FORMAT").map(|f| f == "json").unwrap_or(false);
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing();

    tracing::info!(
        "FreeCRM API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let pool = create_pool(DatabaseConfig {
        max_connections: config.database.max_connections,
        ..DatabaseConfig::with_url(config.database.url.clone())
    })
    .await?;
    run_migrations(&pool).await?;

    let storage = Arc::new(LocalObjectStore::new(config.storage.root.clone()));
    tokio::fs::create_dir_all(storage.root()).await?;
    tracing::info!(root = %storage.root().display(), "Attachment storage ready");

    let bind_address = config.bind_address();
    let app = build_router(AppState::new(pool.clone(), config, storage));

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    close_pool(pool).await;
    tracing::info!("Server stopped");

    Ok(())
}
