//! In-memory accelerator tier
//!
//! A byte-weighted moka cache keyed by hashed name. Losing an entry here is
//! never an error; the caller falls back to the disk tier.

use moka::sync::Cache;
use std::sync::Arc;

/// Default memory budget for one cache instance (64 MB)
pub const DEFAULT_MEMORY_CAPACITY_BYTES: u64 = 64 * 1024 * 1024;

#[derive(Clone)]
pub struct MemoryTier {
    cache: Cache<String, Arc<[u8]>>,
}

impl MemoryTier {
    /// Create a memory tier holding at most `capacity_bytes` of payload
    pub fn new(capacity_bytes: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(capacity_bytes)
            .weigher(|_name: &String, data: &Arc<[u8]>| {
                u32::try_from(data.len()).unwrap_or(u32::MAX)
            })
            .build();

        Self { cache }
    }

    pub fn put(&self, name: &str, data: Arc<[u8]>) {
        self.cache.insert(name.to_string(), data);
    }

    pub fn get(&self, name: &str) -> Option<Arc<[u8]>> {
        self.cache.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.cache.contains_key(name)
    }

    pub fn remove(&self, name: &str) {
        self.cache.invalidate(name);
    }

    pub fn clear(&self) {
        self.cache.invalidate_all();
    }
}

impl Default for MemoryTier {
    fn default() -> Self {
        Self::new(DEFAULT_MEMORY_CAPACITY_BYTES)
    }
}
