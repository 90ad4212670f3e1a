use filetime::FileTime;
use std::collections::HashSet;
use std::path::Path;
use std::time::{Duration, SystemTime};
use tempfile::tempdir;
use tiered_blob_cache::{hashed_name, CacheConfig, TieredCache};

fn open(root: &Path, name: &str) -> TieredCache {
    TieredCache::open(name, &CacheConfig::with_root_dir(root)).unwrap()
}

/// Pretend `key` was last read `age` ago
fn set_last_access(cache: &TieredCache, key: &str, age: Duration) {
    let path = cache.directory().join(hashed_name(key));
    let accessed = FileTime::from_system_time(SystemTime::now() - age);
    filetime::set_file_atime(path, accessed).unwrap();
}

#[tokio::test]
async fn read_after_write_hits_memory_before_disk_catches_up() {
    let root = tempdir().unwrap();
    let cache = open(root.path(), "memory");

    cache.write("key", b"bytes".to_vec());

    assert_eq!(cache.read("key").await, Some(b"bytes".to_vec()));
    assert!(cache.exists("key").await);
    assert_eq!(cache.stats().memory_hits, 1);
}

#[tokio::test]
async fn fresh_instance_reads_what_a_previous_one_persisted() {
    let root = tempdir().unwrap();

    let first = open(root.path(), "restart");
    first.write("key", b"survives".to_vec());
    first.flush().await;
    drop(first);

    let second = open(root.path(), "restart");
    assert!(!second.has_data_on_memory("key"));
    assert_eq!(second.read("key").await, Some(b"survives".to_vec()));
    assert_eq!(second.stats().disk_hits, 1);
}

#[tokio::test]
async fn delete_removes_from_both_tiers() {
    let root = tempdir().unwrap();
    let cache = open(root.path(), "delete");

    cache.write("key", b"bytes".to_vec());
    cache.flush().await;
    cache.delete("key");
    cache.flush().await;

    assert!(!cache.exists("key").await);
    cache.clear_memory();
    assert!(cache.read("key").await.is_none());
}

#[tokio::test]
async fn sweep_expires_entries_past_max_age() {
    let root = tempdir().unwrap();
    let cache = open(root.path(), "age");
    cache.set_max_cache_period_secs(60);

    cache.write("old", b"old".to_vec());
    cache.write("recent", b"recent".to_vec());
    cache.flush().await;
    set_last_access(&cache, "old", Duration::from_secs(61));

    let report = cache.sweep().await.unwrap();

    assert_eq!(report.expired_deleted, 1);
    assert!(!cache.has_data_on_disk("old").await);
    assert!(cache.has_data_on_disk("recent").await);
}

#[tokio::test]
async fn sweep_evicts_least_recently_accessed_to_below_half_cap() {
    let root = tempdir().unwrap();
    let cache = open(root.path(), "size");
    cache.set_max_disk_cache_bytes(100);

    for i in 0..10u64 {
        cache.write(&format!("entry-{}", i), vec![i as u8; 20]);
    }
    cache.flush().await;
    // entry-0 was accessed longest ago, entry-9 most recently
    for i in 0..10u64 {
        let age = Duration::from_secs((10 - i) * 60);
        set_last_access(&cache, &format!("entry-{}", i), age);
    }
    assert_eq!(cache.disk_size().await, 200);

    let report = cache.sweep().await.unwrap();

    assert_eq!(report.evicted_deleted, 8);
    assert_eq!(report.bytes_after, 40);
    assert!(cache.disk_size().await < 50);
    for i in 0..8 {
        assert!(!cache.has_data_on_disk(&format!("entry-{}", i)).await);
    }
    assert!(cache.has_data_on_disk("entry-8").await);
    assert!(cache.has_data_on_disk("entry-9").await);
}

#[tokio::test]
async fn rewritten_entry_is_not_expired_by_age() {
    let root = tempdir().unwrap();
    let cache = open(root.path(), "rewrite-age");
    cache.set_max_cache_period_secs(60);

    cache.write("key", b"v1".to_vec());
    cache.flush().await;
    set_last_access(&cache, "key", Duration::from_secs(60 * 60));

    cache.write("key", b"v2".to_vec());
    cache.flush().await;
    let report = cache.sweep().await.unwrap();

    assert_eq!(report.expired_deleted, 0);
    assert!(cache.has_data_on_disk("key").await);
    assert_eq!(cache.read_from_disk_only("key").await, Some(b"v2".to_vec()));
}

#[tokio::test]
async fn rewritten_entry_survives_size_eviction() {
    let root = tempdir().unwrap();
    let cache = open(root.path(), "rewrite-size");
    cache.set_max_disk_cache_bytes(100);

    for i in 0..10u64 {
        cache.write(&format!("entry-{}", i), vec![i as u8; 20]);
    }
    cache.flush().await;
    for i in 0..10u64 {
        let age = Duration::from_secs((10 - i) * 60);
        set_last_access(&cache, &format!("entry-{}", i), age);
    }
    // entry-0 was the oldest until rewritten
    cache.write("entry-0", vec![0xAA; 20]);
    cache.flush().await;

    let report = cache.sweep().await.unwrap();

    assert_eq!(report.evicted_deleted, 8);
    assert!(cache.has_data_on_disk("entry-0").await);
    assert!(cache.has_data_on_disk("entry-9").await);
    for i in 1..9 {
        assert!(!cache.has_data_on_disk(&format!("entry-{}", i)).await);
    }
}

#[tokio::test]
async fn negative_max_age_never_expires() {
    let root = tempdir().unwrap();
    let cache = open(root.path(), "no-expiry");
    cache.set_max_cache_period_secs(-1);

    cache.write("ancient", b"still here".to_vec());
    cache.flush().await;
    set_last_access(&cache, "ancient", Duration::from_secs(10 * 365 * 24 * 60 * 60));

    let report = cache.sweep().await.unwrap();

    assert_eq!(report.files_deleted(), 0);
    assert!(cache.has_data_on_disk("ancient").await);
}

#[tokio::test]
async fn zero_max_disk_bytes_never_evicts() {
    let root = tempdir().unwrap();
    let cache = open(root.path(), "unbounded");
    cache.set_max_disk_cache_bytes(0);

    for i in 0..16 {
        cache.write(&format!("big-{}", i), vec![0u8; 64 * 1024]);
    }
    cache.flush().await;

    let report = cache.sweep().await.unwrap();

    assert_eq!(report.files_deleted(), 0);
    assert_eq!(cache.cache_files().await.len(), 16);
}

#[tokio::test]
async fn writes_into_missing_directory_never_fail() {
    let root = tempdir().unwrap();
    let cache = open(&root.path().join("does").join("not").join("exist"), "lazy");
    assert!(!cache.directory().exists());

    cache.write("first", b"1".to_vec());
    cache.write("second", b"2".to_vec());
    cache.flush().await;

    assert!(cache.has_data_on_disk("first").await);
    assert!(cache.has_data_on_disk("second").await);
}

#[tokio::test]
async fn deleting_a_missing_key_is_harmless() {
    let root = tempdir().unwrap();
    let cache = open(root.path(), "missing");

    cache.delete("never-written");
    cache.flush().await;

    assert!(!cache.exists("never-written").await);
    cache.write("after", b"ok".to_vec());
    cache.flush().await;
    assert!(cache.has_data_on_disk("after").await);
}

#[test]
fn hashed_names_are_stable_and_distinct() {
    let keys: Vec<String> = (0..1000)
        .map(|i| format!("https://cdn.example.com/img/{}.jpg", i))
        .collect();

    let names: HashSet<String> = keys.iter().map(|k| hashed_name(k)).collect();
    assert_eq!(names.len(), keys.len());

    for key in &keys {
        assert_eq!(hashed_name(key), hashed_name(key));
    }
}

#[tokio::test]
async fn dropped_completion_receiver_does_not_stall_the_queue() {
    let root = tempdir().unwrap();
    let cache = open(root.path(), "detached");

    drop(cache.trigger_expiry_sweep());
    cache.write("key", b"bytes".to_vec());
    cache.flush().await;

    assert!(cache.has_data_on_disk("key").await);
}
