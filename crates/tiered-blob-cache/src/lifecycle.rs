//! Sweep triggers for the composition root
//!
//! The cache never subscribes to host events itself. Whoever owns the cache
//! instances runs these loops and decides which events reach them.

use crate::cache::TieredCache;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

/// Host events that should reclaim disk space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    EnteredBackground,
    Terminating,
}

/// Run one expiry sweep per received event until the sender side closes
pub async fn forward_events(cache: TieredCache, mut events: mpsc::Receiver<LifecycleEvent>) {
    while let Some(event) = events.recv().await {
        info!(cache = %cache.name(), ?event, "Lifecycle event, sweeping disk cache");
        if let Some(report) = cache.sweep().await {
            debug!(
                cache = %cache.name(),
                files_deleted = report.files_deleted(),
                bytes_after = report.bytes_after,
                "Lifecycle sweep finished"
            );
        }
    }
}

/// Sweep on startup and then every `period` until `shutdown` turns true or
/// its sender is dropped
pub async fn run_periodic_sweeps(
    cache: TieredCache,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    info!(
        cache = %cache.name(),
        period_secs = period.as_secs(),
        "Starting periodic disk cache sweeps"
    );

    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!(cache = %cache.name(), "Periodic disk cache sweeps stopping");
                    break;
                }
            }
            _ = ticker.tick() => {
                cache.sweep().await;
            }
        }
    }
}
