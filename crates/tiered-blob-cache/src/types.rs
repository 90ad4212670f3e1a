//! Cache types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::SystemTime;

/// One file in a cache directory, described by filesystem attributes only
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskEntry {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
    /// Last access time, `None` when the filesystem could not report it
    pub accessed: Option<SystemTime>,
}

/// Hit/miss counters for a cache instance
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub memory_hits: u64,
    pub disk_hits: u64,
    pub misses: u64,
}

/// Outcome of one expiry sweep
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepReport {
    pub started_at: DateTime<Utc>,
    pub entries_scanned: usize,
    pub bytes_scanned: u64,
    pub expired_deleted: usize,
    pub evicted_deleted: usize,
    pub delete_failures: usize,
    /// Size of the live entries left once eviction stopped
    pub bytes_after: u64,
}

impl SweepReport {
    pub fn files_deleted(&self) -> usize {
        self.expired_deleted + self.evicted_deleted
    }
}

/// Output encoding for cached images
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    /// Lossy encoding, quality on a 1-100 scale
    Jpeg { quality: u8 },
}

impl Default for ImageFormat {
    fn default() -> Self {
        ImageFormat::Jpeg { quality: 90 }
    }
}
