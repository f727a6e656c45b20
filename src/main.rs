//! Quote Cache - admin server
//!
//! Builds the cache store from the environment, checks the backend once,
//! and serves the admin API until Ctrl+C or SIGTERM.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quote_cache::api::{create_router, AppState};
use quote_cache::cache::{CacheStore, MemoryBackend, RedisBackend, RedisSettings};
use quote_cache::config::{BackendKind, Config};
use quote_cache::{spawn_cleanup_task, stop_cleanup_task, MetricsTracker};

/// Main entry point for the admin server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Build the cache store (Redis, in-process, or disabled)
/// 4. Check the backend once; failures only disable caching
/// 5. Start the expiry sweep for the in-process backend
/// 6. Serve the admin router until a shutdown signal arrives
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quote_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Quote Cache");

    let config = Config::from_env();
    info!(
        "Configuration loaded: cache_enabled={}, backend={:?}, prefix={}, port={}",
        config.cache_enabled, config.cache_backend, config.cache_prefix, config.server_port
    );

    let (store, cleanup_handle) = build_store(&config);
    let store = Arc::new(store);
    store.connect().await;

    let metrics = Arc::new(MetricsTracker::new(config.metrics_enabled));
    let app = create_router(AppState::new(store, metrics));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cleanup_handle))
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Picks the backend named by the configuration.
///
/// A Redis client that cannot even be constructed leaves caching disabled.
fn build_store(config: &Config) -> (CacheStore, Option<JoinHandle<()>>) {
    let prefix = config.cache_prefix.clone();

    if !config.cache_enabled {
        return (CacheStore::disabled(prefix), None);
    }

    match config.cache_backend {
        BackendKind::Redis => match RedisBackend::new(&RedisSettings::from_config(config)) {
            Ok(backend) => (CacheStore::new(Arc::new(backend), prefix), None),
            Err(e) => {
                warn!("Invalid Redis configuration: {}. Caching will be disabled.", e);
                (CacheStore::disabled(prefix), None)
            }
        },
        BackendKind::Memory => {
            let backend = Arc::new(MemoryBackend::new(config.memory_max_entries));
            let handle = spawn_cleanup_task(backend.clone(), config.cleanup_interval);
            (CacheStore::new(backend, prefix), Some(handle))
        }
    }
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, stops the sweep task and allows graceful shutdown.
async fn shutdown_signal(cleanup_handle: Option<JoinHandle<()>>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    if let Some(handle) = cleanup_handle {
        stop_cleanup_task(handle).await;
    }
}
