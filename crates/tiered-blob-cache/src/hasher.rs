//! Cache key hashing

use sha2::{Digest, Sha256};

/// Length of every hashed file name (hex-encoded SHA-256)
pub const HASHED_NAME_LEN: usize = 64;

/// Map an arbitrary cache key to a fixed-length, filesystem-safe file name
pub fn hashed_name(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hex::encode(hasher.finalize())
}
