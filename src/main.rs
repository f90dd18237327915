use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use idos_api::app::{router, AppState};
use idos_api::bus::{Collaborators, CommandBus};
use idos_api::cache::{Cache, NoopCache, RedisCache};
use idos_api::config::config;
use idos_api::database::manager::DatabaseManager;
use idos_api::database::Repositories;
use idos_api::handler::HttpHandshake;
use idos_api::queue::{DisabledQueue, JobQueue, RedisQueue};
use idos_api::sso::HttpProviderClient;
use idos_api::vault::vault;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, REDIS_URL, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = config();
    tracing::info!("Starting idOS API in {:?} mode", config.environment);

    let vault = vault().context("invalid SECURITY_FIELD_KEY")?;
    tracing::info!(encrypted = vault.is_enabled(), "Secure field vault ready");

    let pool = DatabaseManager::pool().context("failed to set up the database pool")?;
    let repos = Repositories::postgres(pool);

    let cache: Arc<dyn Cache> = match config.cache.redis_url.as_deref() {
        Some(url) => Arc::new(RedisCache::new(url, &config.cache).context("invalid cache URL")?),
        None => {
            tracing::warn!("No cache server configured, cache purges are skipped");
            Arc::new(NoopCache)
        }
    };
    let queue: Arc<dyn JobQueue> = match config.queue.redis_url.as_deref() {
        Some(url) => Arc::new(RedisQueue::new(url).context("invalid queue URL")?),
        None => {
            tracing::warn!("No queue server configured, service jobs are dropped");
            Arc::new(DisabledQueue)
        }
    };

    let collaborators = Collaborators {
        handshake: Arc::new(HttpHandshake::new().context("failed to build the hook client")?),
        provider: Arc::new(HttpProviderClient::new().context("failed to build the provider client")?),
        cache,
        queue,
    };
    let bus = CommandBus::wired(&repos, collaborators);
    let app = router(AppState::new(bus, repos));

    let bind_addr = SocketAddr::from(([0, 0, 0, 0], config.api.port));
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("idOS API listening on http://{}", bind_addr);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    DatabaseManager::close().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
