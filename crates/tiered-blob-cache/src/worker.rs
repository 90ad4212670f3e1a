//! Per-instance disk worker
//!
//! Every disk mutation of a cache instance goes through one spawned task that
//! drains an unbounded channel, so mutations run strictly in enqueue order.
//! Failures are logged here and never reach the caller.

use crate::disk::DiskStore;
use crate::error::{CacheError, Result};
use crate::sweeper::{self, SharedPolicy};
use crate::types::SweepReport;
use std::io;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

pub(crate) enum DiskOp {
    Write {
        name: String,
        data: Arc<[u8]>,
    },
    Remove {
        name: String,
    },
    RemoveAll,
    Sweep {
        completion: oneshot::Sender<SweepReport>,
    },
    Flush {
        done: oneshot::Sender<()>,
    },
}

pub(crate) struct DiskWorker {
    label: String,
    tx: mpsc::UnboundedSender<DiskOp>,
}

impl DiskWorker {
    /// Spawn the worker task on the current tokio runtime. The task exits
    /// once every `DiskWorker` handle is dropped and the queue is drained.
    pub(crate) fn spawn(
        label: String,
        store: Arc<DiskStore>,
        policy: Arc<SharedPolicy>,
    ) -> Result<Self> {
        let handle = Handle::try_current().map_err(|e| CacheError::Runtime(e.to_string()))?;
        let (tx, rx) = mpsc::unbounded_channel();

        handle.spawn(run(label.clone(), store, policy, rx));

        Ok(Self { label, tx })
    }

    pub(crate) fn enqueue(&self, op: DiskOp) {
        if self.tx.send(op).is_err() {
            warn!(queue = %self.label, "Disk worker stopped, dropping disk operation");
        }
    }
}

async fn run(
    label: String,
    store: Arc<DiskStore>,
    policy: Arc<SharedPolicy>,
    mut rx: mpsc::UnboundedReceiver<DiskOp>,
) {
    debug!(queue = %label, dir = %store.directory().display(), "Disk worker started");

    while let Some(op) = rx.recv().await {
        execute(&store, &policy, op).await;
    }

    debug!(queue = %label, "Disk worker stopped");
}

async fn execute(store: &Arc<DiskStore>, policy: &SharedPolicy, op: DiskOp) {
    match op {
        DiskOp::Write { name, data } => {
            if let Err(e) = store.write(&name, &data).await {
                warn!(name = %name, error = %e, "Failed to write cache file");
            } else {
                debug!(name = %name, size = data.len(), "Wrote cache file");
            }
        }
        DiskOp::Remove { name } => match store.remove(&name).await {
            Ok(()) => debug!(name = %name, "Removed cache file"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(name = %name, "Cache file to remove does not exist");
            }
            Err(e) => warn!(name = %name, error = %e, "Failed to remove cache file"),
        },
        DiskOp::RemoveAll => match store.remove_all().await {
            Ok(()) => debug!(dir = %store.directory().display(), "Cleared disk cache"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(dir = %store.directory().display(), "Disk cache already empty");
            }
            Err(e) => warn!(
                dir = %store.directory().display(),
                error = %e,
                "Failed to clear disk cache"
            ),
        },
        DiskOp::Sweep { completion } => {
            let snapshot = policy.snapshot();
            let store = Arc::clone(store);
            match tokio::task::spawn_blocking(move || sweeper::run_sweep(&store, snapshot)).await
            {
                Ok(report) => {
                    // Receiver may have been dropped; completion is optional
                    let _ = completion.send(report);
                }
                Err(e) => warn!(error = %e, "Disk cache sweep task failed"),
            }
        }
        DiskOp::Flush { done } => {
            let _ = done.send(());
        }
    }
}
