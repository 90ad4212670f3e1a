//! Disk tier: one flat file per hashed name inside the instance directory
//!
//! Entry metadata (size, last access) is read from directory entry
//! attributes. Payloads are never opened during a scan, so scanning does not
//! disturb the access times the sweeper orders by.

use crate::error::{CacheError, Result};
use crate::types::DiskEntry;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::fs;
use tracing::{debug, warn};

/// File-per-entry storage rooted at a single directory
#[derive(Debug, Clone)]
pub struct DiskStore {
    dir: PathBuf,
}

impl DiskStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn directory(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Create or replace the file for `name`, creating the directory first
    /// if it does not exist yet.
    ///
    /// The payload goes to a hidden temp file that is then renamed over the
    /// target, so a rewrite is a new file with a fresh access time and readers
    /// never see a partial payload.
    pub async fn write(&self, name: &str, data: &[u8]) -> Result<()> {
        let dir = self.dir.clone();
        let target = self.path_for(name);
        let data = data.to_vec();

        tokio::task::spawn_blocking(move || replace_file(&dir, &target, &data))
            .await
            .map_err(|e| CacheError::Runtime(e.to_string()))?
    }

    /// Read the payload for `name`. A missing file is a plain miss.
    pub async fn read(&self, name: &str) -> Option<Vec<u8>> {
        match fs::read(self.path_for(name)).await {
            Ok(data) => Some(data),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!(name = %name, error = %e, "Failed to read cached file");
                None
            }
        }
    }

    pub async fn exists(&self, name: &str) -> bool {
        fs::metadata(self.path_for(name))
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    }

    pub async fn remove(&self, name: &str) -> io::Result<()> {
        fs::remove_file(self.path_for(name)).await
    }

    /// Delete the whole instance directory; the next write recreates it
    pub async fn remove_all(&self) -> io::Result<()> {
        fs::remove_dir_all(&self.dir).await
    }

    /// Enumerate the regular files currently in the directory.
    ///
    /// Blocking; call from a blocking context. A directory that does not
    /// exist yet yields nothing.
    pub fn list_entries(&self) -> DiskEntries {
        let read_dir = match std::fs::read_dir(&self.dir) {
            Ok(read_dir) => Some(read_dir),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(dir = %self.dir.display(), "Cache directory not created yet");
                None
            }
            Err(e) => {
                warn!(dir = %self.dir.display(), error = %e, "Failed to read cache directory");
                None
            }
        };

        DiskEntries { read_dir }
    }
}

fn replace_file(dir: &Path, target: &Path, data: &[u8]) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(data)?;
    file.persist(target).map_err(|e| e.error)?;
    Ok(())
}

/// One-shot iterator over the files of a [`DiskStore`] directory
pub struct DiskEntries {
    read_dir: Option<std::fs::ReadDir>,
}

impl Iterator for DiskEntries {
    type Item = DiskEntry;

    fn next(&mut self) -> Option<DiskEntry> {
        let read_dir = self.read_dir.as_mut()?;

        for item in read_dir.by_ref() {
            let entry = match item {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "Failed to iterate cache directory");
                    continue;
                }
            };

            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }

            // stat only, never open(): the access time must stay untouched
            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(e) => {
                    debug!(name = %name, error = %e, "Failed to stat cache file");
                    continue;
                }
            };
            if !metadata.is_file() {
                continue;
            }

            return Some(DiskEntry {
                name,
                path: entry.path(),
                size: metadata.len(),
                accessed: metadata.accessed().ok(),
            });
        }

        self.read_dir = None;
        None
    }
}
