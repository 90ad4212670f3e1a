//! Two-tier blob cache with TTL expiration and LRU eviction
//!
//! Stores binary payloads under opaque string keys in a bounded in-memory
//! tier backed by a flat directory of files. The directory is the source of
//! truth: sizes and access times come from filesystem attributes on every
//! sweep, never from a persisted index.

mod cache;
mod codec;
mod config;
mod disk;
mod error;
mod hasher;
pub mod lifecycle;
mod memory;
mod sweeper;
mod types;
mod worker;

pub use cache::{TieredCache, CACHE_DIR_PREFIX, DEFAULT_INSTANCE_NAME};
pub use codec::{decode_image, encode_image};
pub use config::CacheConfig;
pub use disk::{DiskEntries, DiskStore};
pub use error::{CacheError, Result};
pub use hasher::{hashed_name, HASHED_NAME_LEN};
pub use lifecycle::LifecycleEvent;
pub use memory::MemoryTier;
pub use sweeper::{plan_sweep, run_sweep, SweepPlan, SweepPolicy};
pub use types::{CacheStats, DiskEntry, ImageFormat, SweepReport};
