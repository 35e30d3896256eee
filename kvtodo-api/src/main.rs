//! # kvtodo API Server
//!
//! Task-tracking backend: users register and log in, then create, list and
//! update their own tasks. Records live in Redis.
//!
//! ## Usage
//!
//! ```bash
//! REDIS_URL=redis://localhost:6379 JWT_SECRET=... cargo run -p kvtodo-api
//! ```

use kvtodo_api::{
    app::{build_router, AppState},
    config::Config,
};
use kvtodo_shared::store::RedisStore;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "kvtodo_api=debug,kvtodo_shared=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "kvtodo API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;

    let store = RedisStore::connect(config.redis.clone()).await?;

    let bind_address = config.bind_address();
    let state = AppState::new(Arc::new(store), &config)?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, exiting...");
}
