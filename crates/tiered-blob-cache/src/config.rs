//! Cache instance configuration

use crate::memory::DEFAULT_MEMORY_CAPACITY_BYTES;
use std::path::PathBuf;

/// Default age limit: one week
pub const DEFAULT_MAX_CACHE_PERIOD_SECS: i64 = 7 * 24 * 60 * 60;

/// Configuration shared by every instance opened from it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Directory holding one `<prefix>.<name>` subdirectory per instance
    pub root_dir: PathBuf,
    /// Age limit in seconds; negative disables age expiry
    pub max_cache_period_secs: i64,
    /// Disk size cap in bytes; zero means unbounded
    pub max_disk_cache_bytes: u64,
    pub memory_capacity_bytes: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            root_dir: Self::default_root_dir(),
            max_cache_period_secs: DEFAULT_MAX_CACHE_PERIOD_SECS,
            max_disk_cache_bytes: 0,
            memory_capacity_bytes: DEFAULT_MEMORY_CAPACITY_BYTES,
        }
    }
}

impl CacheConfig {
    /// The platform cache directory, or the temp directory when there is none
    ///
    /// - macOS: ~/Library/Caches
    /// - Linux: $XDG_CACHE_HOME or ~/.cache
    /// - Windows: %LOCALAPPDATA%
    pub fn default_root_dir() -> PathBuf {
        dirs::cache_dir().unwrap_or_else(std::env::temp_dir)
    }

    /// Default configuration rooted at `root_dir`
    pub fn with_root_dir(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            ..Self::default()
        }
    }

    /// Load configuration from environment variables.
    ///
    /// - `BLOB_CACHE_DIR`: root directory for instance directories
    /// - `BLOB_CACHE_MAX_AGE_SECS`: age limit, negative to disable (default: 7 days)
    /// - `BLOB_CACHE_MAX_DISK_BYTES`: disk cap, 0 for unbounded (default: 0)
    /// - `BLOB_CACHE_MEMORY_BYTES`: memory tier budget (default: 64 MB)
    ///
    /// Missing or unparsable values fall back to the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let root_dir = lookup("BLOB_CACHE_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.root_dir);

        let max_cache_period_secs = lookup("BLOB_CACHE_MAX_AGE_SECS")
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(defaults.max_cache_period_secs);

        let max_disk_cache_bytes = lookup("BLOB_CACHE_MAX_DISK_BYTES")
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(defaults.max_disk_cache_bytes);

        let memory_capacity_bytes = lookup("BLOB_CACHE_MEMORY_BYTES")
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(defaults.memory_capacity_bytes);

        Self {
            root_dir,
            max_cache_period_secs,
            max_disk_cache_bytes,
            memory_capacity_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.max_cache_period_secs, 604_800);
        assert_eq!(config.max_disk_cache_bytes, 0);
        assert_eq!(config.memory_capacity_bytes, 64 * 1024 * 1024);
        assert_eq!(config.root_dir, CacheConfig::default_root_dir());
    }

    #[test]
    fn test_from_lookup_reads_values() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("BLOB_CACHE_DIR", "/var/cache/blobs"),
            ("BLOB_CACHE_MAX_AGE_SECS", "-1"),
            ("BLOB_CACHE_MAX_DISK_BYTES", "1048576"),
            ("BLOB_CACHE_MEMORY_BYTES", "4096"),
        ]);

        let config = CacheConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(config.root_dir, PathBuf::from("/var/cache/blobs"));
        assert_eq!(config.max_cache_period_secs, -1);
        assert_eq!(config.max_disk_cache_bytes, 1_048_576);
        assert_eq!(config.memory_capacity_bytes, 4096);
    }

    #[test]
    fn test_from_lookup_falls_back_on_garbage() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("BLOB_CACHE_MAX_AGE_SECS", "a week"),
            ("BLOB_CACHE_MAX_DISK_BYTES", "-5"),
        ]);

        let config = CacheConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(config, CacheConfig::default());
    }

    #[test]
    fn test_with_root_dir() {
        let config = CacheConfig::with_root_dir("/tmp/blobs");
        assert_eq!(config.root_dir, PathBuf::from("/tmp/blobs"));
        assert_eq!(config.max_cache_period_secs, DEFAULT_MAX_CACHE_PERIOD_SECS);
    }
}
