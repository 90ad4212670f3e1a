//! Expiry sweeps: age-based deletion followed by size-capped LRU reclamation
//!
//! A sweep is split into a pure planning step over a directory listing and an
//! execution step that issues the deletions. Planning never touches the
//! filesystem, so the eviction order can be tested against synthetic listings.
//!
//! The size pass evicts down to *below half* the cap rather than to the cap
//! itself, leaving headroom so a cache hovering near its limit is not swept on
//! every insert.

use crate::disk::DiskStore;
use crate::types::{DiskEntry, SweepReport};
use chrono::Utc;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

/// Age and size limits applied by one sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SweepPolicy {
    /// Entries last accessed this long ago or earlier are deleted. `None` disables.
    pub max_age: Option<Duration>,
    /// Size cap for the directory. `None` disables.
    pub max_disk_bytes: Option<u64>,
}

impl SweepPolicy {
    /// Build a policy from the configuration sentinels: a negative age means
    /// "never expire", a zero byte cap means "unbounded"
    pub fn from_limits(max_cache_period_secs: i64, max_disk_cache_bytes: u64) -> Self {
        let max_age = u64::try_from(max_cache_period_secs)
            .ok()
            .map(Duration::from_secs);
        let max_disk_bytes = (max_disk_cache_bytes > 0).then_some(max_disk_cache_bytes);

        Self {
            max_age,
            max_disk_bytes,
        }
    }
}

/// Tunables shared between a cache handle and its disk worker, read at the
/// moment a sweep executes
#[derive(Debug)]
pub(crate) struct SharedPolicy {
    max_cache_period_secs: AtomicI64,
    max_disk_cache_bytes: AtomicU64,
}

impl SharedPolicy {
    pub(crate) fn new(max_cache_period_secs: i64, max_disk_cache_bytes: u64) -> Self {
        Self {
            max_cache_period_secs: AtomicI64::new(max_cache_period_secs),
            max_disk_cache_bytes: AtomicU64::new(max_disk_cache_bytes),
        }
    }

    pub(crate) fn max_cache_period_secs(&self) -> i64 {
        self.max_cache_period_secs.load(Ordering::Relaxed)
    }

    pub(crate) fn set_max_cache_period_secs(&self, secs: i64) {
        self.max_cache_period_secs.store(secs, Ordering::Relaxed);
    }

    pub(crate) fn max_disk_cache_bytes(&self) -> u64 {
        self.max_disk_cache_bytes.load(Ordering::Relaxed)
    }

    pub(crate) fn set_max_disk_cache_bytes(&self, bytes: u64) {
        self.max_disk_cache_bytes.store(bytes, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> SweepPolicy {
        SweepPolicy::from_limits(self.max_cache_period_secs(), self.max_disk_cache_bytes())
    }
}

/// Entries selected for deletion by one sweep
#[derive(Debug, Clone, Default)]
pub struct SweepPlan {
    /// Deleted by the age pass
    pub expired: Vec<DiskEntry>,
    /// Deleted by the size pass, least recently accessed first
    pub evicted: Vec<DiskEntry>,
    pub entries_scanned: usize,
    pub bytes_scanned: u64,
    /// Size of the entries that survived the age pass
    pub live_bytes: u64,
    /// Size left once the size pass stopped
    pub remaining_bytes: u64,
}

/// Decide which entries a sweep at `now` deletes
pub fn plan_sweep<I>(entries: I, policy: &SweepPolicy, now: SystemTime) -> SweepPlan
where
    I: IntoIterator<Item = DiskEntry>,
{
    let expired_before = policy.max_age.and_then(|age| now.checked_sub(age));

    let mut plan = SweepPlan::default();
    let mut live = Vec::new();

    for entry in entries {
        plan.entries_scanned += 1;
        plan.bytes_scanned += entry.size;

        // Unknown access time never counts as expired
        let expired = match (expired_before, entry.accessed) {
            (Some(cutoff), Some(accessed)) => accessed <= cutoff,
            _ => false,
        };

        if expired {
            plan.expired.push(entry);
        } else {
            plan.live_bytes += entry.size;
            live.push(entry);
        }
    }

    let mut remaining = plan.live_bytes;

    if let Some(max_bytes) = policy.max_disk_bytes {
        if remaining > max_bytes {
            let target = max_bytes / 2;

            // None sorts first: an entry with no access time is the least provably recent
            live.sort_by(|a, b| {
                a.accessed
                    .cmp(&b.accessed)
                    .then_with(|| a.name.cmp(&b.name))
            });

            for entry in live {
                remaining = remaining.saturating_sub(entry.size);
                plan.evicted.push(entry);
                if remaining < target {
                    break;
                }
            }
        }
    }

    plan.remaining_bytes = remaining;
    plan
}

/// Scan `store`, then delete whatever [`plan_sweep`] selects.
///
/// Blocking. Individual delete failures are logged and counted; the sweep
/// carries on with the remaining candidates.
pub fn run_sweep(store: &DiskStore, policy: SweepPolicy) -> SweepReport {
    let started_at = Utc::now();
    let plan = plan_sweep(store.list_entries(), &policy, SystemTime::now());

    let mut report = SweepReport {
        started_at,
        entries_scanned: plan.entries_scanned,
        bytes_scanned: plan.bytes_scanned,
        expired_deleted: 0,
        evicted_deleted: 0,
        delete_failures: 0,
        bytes_after: plan.remaining_bytes,
    };

    for entry in &plan.expired {
        if delete_entry(entry) {
            report.expired_deleted += 1;
        } else {
            report.delete_failures += 1;
        }
    }

    for entry in &plan.evicted {
        if delete_entry(entry) {
            report.evicted_deleted += 1;
        } else {
            report.delete_failures += 1;
        }
    }

    if report.files_deleted() > 0 || report.delete_failures > 0 {
        info!(
            dir = %store.directory().display(),
            entries_scanned = report.entries_scanned,
            expired_deleted = report.expired_deleted,
            evicted_deleted = report.evicted_deleted,
            delete_failures = report.delete_failures,
            bytes_before = report.bytes_scanned,
            bytes_after = report.bytes_after,
            "Disk cache sweep complete"
        );
    } else {
        debug!(
            dir = %store.directory().display(),
            entries_scanned = report.entries_scanned,
            bytes = report.bytes_scanned,
            "Disk cache sweep found nothing to delete"
        );
    }

    report
}

fn delete_entry(entry: &DiskEntry) -> bool {
    match std::fs::remove_file(&entry.path) {
        Ok(()) => true,
        Err(e) => {
            // Usually a file removed by someone else since the scan
            warn!(
                path = %entry.path.display(),
                error = %e,
                "Failed to delete cache file during sweep"
            );
            false
        }
    }
}
