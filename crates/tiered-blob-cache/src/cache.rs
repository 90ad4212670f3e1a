//! Read-through/write-through facade over the memory and disk tiers

use crate::config::CacheConfig;
use crate::disk::DiskStore;
use crate::error::Result;
use crate::hasher::hashed_name;
use crate::memory::MemoryTier;
use crate::sweeper::SharedPolicy;
use crate::types::{CacheStats, SweepReport};
use crate::worker::{DiskOp, DiskWorker};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Prefix of every instance directory name (`<prefix>.<name>`)
pub const CACHE_DIR_PREFIX: &str = "tiered-blob-cache";

/// Name of the well-known instance opened by [`TieredCache::open_default`]
pub const DEFAULT_INSTANCE_NAME: &str = "default";

/// A named two-tier cache instance.
///
/// Writes land in memory immediately and reach disk asynchronously through a
/// per-instance ordered worker. Reads try memory first, then disk, and
/// backfill memory on a disk hit. I/O failures are logged and degrade to a
/// miss; they are never returned to the caller.
///
/// Cloning is cheap and shares the instance. Dropping the last handle lets the
/// disk worker finish its queue and exit.
#[derive(Clone)]
pub struct TieredCache {
    inner: Arc<Inner>,
}

struct Inner {
    name: String,
    memory: MemoryTier,
    disk: Arc<DiskStore>,
    worker: DiskWorker,
    policy: Arc<SharedPolicy>,
    memory_hits: AtomicU64,
    disk_hits: AtomicU64,
    misses: AtomicU64,
}

impl TieredCache {
    /// Open the instance called `name` under `config.root_dir`.
    ///
    /// Must be called from within a tokio runtime, which hosts the disk worker.
    /// The directory itself is created lazily by the first write.
    pub fn open(name: &str, config: &CacheConfig) -> Result<Self> {
        let dir = config
            .root_dir
            .join(format!("{}.{}", CACHE_DIR_PREFIX, name));
        let disk = Arc::new(DiskStore::new(dir));
        let policy = Arc::new(SharedPolicy::new(
            config.max_cache_period_secs,
            config.max_disk_cache_bytes,
        ));
        let worker = DiskWorker::spawn(
            format!("{}.queue.{}", CACHE_DIR_PREFIX, name),
            Arc::clone(&disk),
            Arc::clone(&policy),
        )?;

        info!(
            name = %name,
            dir = %disk.directory().display(),
            max_cache_period_secs = config.max_cache_period_secs,
            max_disk_cache_bytes = config.max_disk_cache_bytes,
            "Cache instance opened"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                name: name.to_string(),
                memory: MemoryTier::new(config.memory_capacity_bytes),
                disk,
                worker,
                policy,
                memory_hits: AtomicU64::new(0),
                disk_hits: AtomicU64::new(0),
                misses: AtomicU64::new(0),
            }),
        })
    }

    /// Open the well-known default instance
    pub fn open_default(config: &CacheConfig) -> Result<Self> {
        Self::open(DEFAULT_INSTANCE_NAME, config)
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The instance directory, `<root>/<prefix>.<name>`
    pub fn directory(&self) -> &Path {
        self.inner.disk.directory()
    }

    pub fn max_cache_period_secs(&self) -> i64 {
        self.inner.policy.max_cache_period_secs()
    }

    /// Change the age limit used by subsequent sweeps; negative disables it
    pub fn set_max_cache_period_secs(&self, secs: i64) {
        self.inner.policy.set_max_cache_period_secs(secs);
    }

    pub fn max_disk_cache_bytes(&self) -> u64 {
        self.inner.policy.max_disk_cache_bytes()
    }

    /// Change the size cap used by subsequent sweeps; zero means unbounded
    pub fn set_max_disk_cache_bytes(&self, bytes: u64) {
        self.inner.policy.set_max_disk_cache_bytes(bytes);
    }

    /// Store `data` under `key`. Memory is updated before this returns; the
    /// disk write is queued and not acknowledged.
    pub fn write(&self, key: &str, data: impl Into<Vec<u8>>) {
        let name = hashed_name(key);
        let data: Vec<u8> = data.into();
        let data: Arc<[u8]> = Arc::from(data);

        self.inner.memory.put(&name, Arc::clone(&data));
        debug!(key = %key, name = %name, size = data.len(), "Queued cache write");
        self.inner.worker.enqueue(DiskOp::Write { name, data });
    }

    /// Fetch the payload for `key`, consulting disk on a memory miss
    pub async fn read(&self, key: &str) -> Option<Vec<u8>> {
        let name = hashed_name(key);

        if let Some(data) = self.inner.memory.get(&name) {
            self.inner.memory_hits.fetch_add(1, Ordering::Relaxed);
            debug!(key = %key, "Memory cache hit");
            return Some(data.to_vec());
        }

        match self.inner.disk.read(&name).await {
            Some(data) => {
                self.inner.disk_hits.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, size = data.len(), "Disk cache hit");
                self.inner.memory.put(&name, Arc::from(data.as_slice()));
                Some(data)
            }
            None => {
                self.inner.misses.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, "Cache miss");
                None
            }
        }
    }

    /// Fetch the payload for `key` from disk without touching the memory tier
    pub async fn read_from_disk_only(&self, key: &str) -> Option<Vec<u8>> {
        self.inner.disk.read(&hashed_name(key)).await
    }

    /// True if either tier holds `key`
    pub async fn exists(&self, key: &str) -> bool {
        let name = hashed_name(key);
        self.inner.memory.contains(&name) || self.inner.disk.exists(&name).await
    }

    pub fn has_data_on_memory(&self, key: &str) -> bool {
        self.inner.memory.contains(&hashed_name(key))
    }

    pub async fn has_data_on_disk(&self, key: &str) -> bool {
        self.inner.disk.exists(&hashed_name(key)).await
    }

    /// Remove `key` from memory now and from disk once the queue reaches it
    pub fn delete(&self, key: &str) {
        let name = hashed_name(key);
        self.inner.memory.remove(&name);
        self.inner.worker.enqueue(DiskOp::Remove { name });
    }

    pub fn clear_memory(&self) {
        self.inner.memory.clear();
    }

    /// Queue removal of the whole instance directory
    pub fn clear_disk(&self) {
        self.inner.worker.enqueue(DiskOp::RemoveAll);
    }

    pub fn clear_all(&self) {
        self.clear_memory();
        self.clear_disk();
    }

    /// Queue an expiry sweep.
    ///
    /// The returned receiver resolves with the sweep report once every
    /// deletion has been issued. Dropping it is fine when no completion
    /// signal is wanted.
    pub fn trigger_expiry_sweep(&self) -> oneshot::Receiver<SweepReport> {
        let (completion, report) = oneshot::channel();
        self.inner.worker.enqueue(DiskOp::Sweep { completion });
        report
    }

    /// Queue an expiry sweep and wait for its report. `None` if the disk
    /// worker is gone.
    pub async fn sweep(&self) -> Option<SweepReport> {
        self.trigger_expiry_sweep().await.ok()
    }

    /// Wait until every disk operation queued before this call has run
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        self.inner.worker.enqueue(DiskOp::Flush { done });
        let _ = wait.await;
    }

    /// Paths of every cached file currently on disk
    pub async fn cache_files(&self) -> Vec<PathBuf> {
        let disk = Arc::clone(&self.inner.disk);
        tokio::task::spawn_blocking(move || {
            disk.list_entries().map(|e| e.path).collect::<Vec<_>>()
        })
        .await
        .unwrap_or_else(|e| {
            warn!(error = %e, "Failed to list cache files");
            Vec::new()
        })
    }

    /// Total size of the cached files, computed by a fresh directory scan
    pub async fn disk_size(&self) -> u64 {
        let disk = Arc::clone(&self.inner.disk);
        tokio::task::spawn_blocking(move || disk.list_entries().map(|e| e.size).sum::<u64>())
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to compute disk cache size");
                0
            })
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            memory_hits: self.inner.memory_hits.load(Ordering::Relaxed),
            disk_hits: self.inner.disk_hits.load(Ordering::Relaxed),
            misses: self.inner.misses.load(Ordering::Relaxed),
        }
    }
}
