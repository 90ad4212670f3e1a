//! Blob cache janitor
//!
//! Owns one tiered cache instance and keeps its directory within the
//! configured age and size limits: sweeps on a timer, and once more when the
//! process is asked to terminate.

use std::time::Duration;
use tiered_blob_cache::lifecycle::{self, LifecycleEvent};
use tiered_blob_cache::{CacheConfig, CacheError, Result, TieredCache, DEFAULT_INSTANCE_NAME};
use tokio::sync::{mpsc, watch};
use tracing::{error, info};
use tracing_subscriber::{prelude::*, EnvFilter};

const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60 * 60;

#[derive(Debug, Clone)]
struct JanitorConfig {
    cache_name: String,
    sweep_interval: Duration,
    cache: CacheConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let env_filter = EnvFilter::from_default_env()
        .add_directive("blob_cache_janitor=info".parse().map_err(config_error)?)
        .add_directive("tiered_blob_cache=info".parse().map_err(config_error)?);

    // Use JSON format for GCP Cloud Logging when LOG_FORMAT=json
    if std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false)
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_stackdriver::layer())
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    };

    info!("Starting blob cache janitor...");

    let config = load_config();
    let cache = TieredCache::open(&config.cache_name, &config.cache)?;
    info!("Cache dir: {:?}", cache.directory());
    info!("Max cache period: {} seconds", cache.max_cache_period_secs());
    info!("Max disk cache size: {} bytes", cache.max_disk_cache_bytes());
    info!("Sweep interval: {} seconds", config.sweep_interval.as_secs());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let periodic = tokio::spawn(lifecycle::run_periodic_sweeps(
        cache.clone(),
        config.sweep_interval,
        shutdown_rx,
    ));

    let (event_tx, event_rx) = mpsc::channel(8);
    let forwarder = tokio::spawn(lifecycle::forward_events(cache.clone(), event_rx));

    wait_for_termination().await;
    info!("Termination requested, running final sweep");

    let _ = shutdown_tx.send(true);
    if let Err(e) = periodic.await {
        error!("Periodic sweep task failed: {}", e);
    }

    if event_tx.send(LifecycleEvent::Terminating).await.is_err() {
        error!("Lifecycle forwarder already stopped");
    }
    drop(event_tx);
    if let Err(e) = forwarder.await {
        error!("Lifecycle forwarder failed: {}", e);
    }

    cache.flush().await;
    info!("Blob cache janitor stopped");

    Ok(())
}

fn load_config() -> JanitorConfig {
    let cache_name = std::env::var("BLOB_CACHE_NAME")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_INSTANCE_NAME.to_string());

    let sweep_interval_secs = std::env::var("BLOB_CACHE_SWEEP_INTERVAL_SECS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .unwrap_or(DEFAULT_SWEEP_INTERVAL_SECS);

    JanitorConfig {
        cache_name,
        sweep_interval: Duration::from_secs(sweep_interval_secs),
        cache: CacheConfig::from_env(),
    }
}

fn config_error(err: tracing_subscriber::filter::ParseError) -> CacheError {
    CacheError::Config(err.to_string())
}

/// Resolve on Ctrl-C, or SIGTERM on unix
async fn wait_for_termination() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = terminate.recv() => {}
                }
                return;
            }
            Err(e) => error!("Failed to install SIGTERM handler: {}", e),
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {}", e);
    }
}
