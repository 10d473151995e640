//! HTTP server initialization and runtime setup.
//!
//! Builds every store client explicitly from [`Config`], wires the services,
//! spawns the click worker and runs axum until a shutdown signal arrives.

use crate::application::services::{AuthService, LinkService, RateLimiter};
use crate::config::Config;
use crate::domain::click_event::ClickEvent;
use crate::domain::click_worker::run_click_worker;
use crate::domain::repositories::LinkRepository;
use crate::infrastructure::cache::{KeyValueStore, MemoryStore, RedisStore, ResolutionCache};
use crate::infrastructure::persistence::PgLinkRepository;
use crate::routes::app_router;
use crate::state::AppState;

use anyhow::{Context, Result};
use axum::ServiceExt;
use axum::extract::Request;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// How long the click worker gets to drain after the server stops.
const WORKER_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Opens the PostgreSQL pool and applies embedded migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn connect_database(config: &Config) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_connect_timeout))
        .idle_timeout(Duration::from_secs(config.db_idle_timeout))
        .max_lifetime(Duration::from_secs(config.db_max_lifetime))
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Connected to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;

    Ok(pool)
}

/// Connects the key-value store backing the resolution cache and rate limiter.
///
/// Without Redis configured, an in-process store is used. A configured but
/// unreachable Redis is an error: the store is authoritative for redirects.
pub async fn connect_key_value_store(config: &Config) -> Result<Arc<dyn KeyValueStore>> {
    match &config.redis_url {
        Some(redis_url) => {
            let store = RedisStore::connect(redis_url)
                .await
                .context("Failed to connect to Redis")?;
            tracing::info!("Key-value store: Redis");
            Ok(Arc::new(store))
        }
        None => {
            tracing::warn!(
                "REDIS_URL not set, using in-process key-value store. \
                 Cache entries and rate limits are not shared between instances."
            );
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

/// Wires a [`LinkService`] from configuration and already connected stores.
pub fn build_link_service(
    config: &Config,
    repository: Arc<dyn LinkRepository>,
    kv_store: Arc<dyn KeyValueStore>,
    click_sender: mpsc::Sender<ClickEvent>,
) -> LinkService {
    let cache = ResolutionCache::new(kv_store.clone(), config.cache_timeout());
    let limiter = RateLimiter::new(
        kv_store,
        config.rate_limit_max_requests,
        config.rate_limit_window(),
        config.rate_limit_timeout(),
        config.rate_limit_fail_mode,
    );

    LinkService::new(
        repository,
        cache,
        limiter,
        click_sender,
        config.app_url.clone(),
    )
}

/// Runs the HTTP server with the given configuration.
///
/// Initializes:
/// - PostgreSQL connection pool and migrations
/// - Redis (or in-process) key-value store
/// - Background click worker
/// - Axum HTTP server with graceful shutdown
///
/// # Errors
///
/// Returns an error if a store connection fails, the server cannot bind, or the
/// server hits a runtime error.
pub async fn run(config: Config) -> Result<()> {
    let pool = connect_database(&config).await?;
    let kv_store = connect_key_value_store(&config).await?;

    let repository: Arc<dyn LinkRepository> =
        Arc::new(PgLinkRepository::new(Arc::new(pool), config.store_timeout()));

    let (click_tx, click_rx) = mpsc::channel(config.click_queue_capacity);
    let worker = tokio::spawn(run_click_worker(
        click_rx,
        repository.clone(),
        config.click_worker_concurrency,
    ));
    tracing::info!("Click worker started");

    let link_service = build_link_service(
        &config,
        repository.clone(),
        kv_store.clone(),
        click_tx.clone(),
    );

    let state = AppState {
        link_service: Arc::new(link_service),
        auth_service: Arc::new(AuthService::new(
            config.session_signing_secret.clone(),
            config.session_ttl_seconds,
        )),
        kv_store,
        repository,
        click_sender: click_tx,
        behind_proxy: config.behind_proxy,
    };

    let app = app_router(state);

    let addr: SocketAddr = config.listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{addr}");

    axum::serve(
        listener,
        ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    // The router held the last senders; the worker now drains and exits.
    tracing::info!("Server stopped, draining click queue");
    if tokio::time::timeout(WORKER_DRAIN_TIMEOUT, worker).await.is_err() {
        tracing::warn!("Click worker did not drain in time, pending clicks are lost");
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
