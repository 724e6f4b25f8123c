// Copyright 2026 shutter Project Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::{
    fmt::Debug,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    time::SystemTime,
};

use itertools::Itertools;
use shutter_common::key::CacheKey;
use tokio::fs;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Extension of every blob file under the cache directory. Recovery and
/// the capacity sweep only consider files carrying it.
const FILE_EXT: &str = "img";

/// Sweeps stop once usage drops below this share of the budget, so a
/// single overflowing write does not trigger a sweep per write.
const SWEEP_LOW_WATERMARK: f64 = 0.9;

/// Default total-size budget.
const DEFAULT_CAPACITY: u64 = 64 * 1024 * 1024;

/// Nonce for temp file names, so concurrent writers of the same key never
/// share a temp file.
static TMP_NONCE: AtomicU64 = AtomicU64::new(0);

struct Shared {
    dir: PathBuf,
    capacity: u64,
    /// Approximate total size of the blob files. Updated with atomic
    /// increments/decrements by every writer; exact only when quiescent.
    size: AtomicU64,
    /// At most one sweep runs at a time.
    sweeping: AtomicBool,
}

/// Persistent blob cache, one file per key.
///
/// Cheaply clonable handle; clones share the directory and the size
/// ledger. All operations are async and never block a shared thread.
pub struct DiskCache {
    shared: Arc<Shared>,
}

impl Debug for DiskCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiskCache")
            .field("dir", &self.shared.dir)
            .field("capacity", &self.shared.capacity)
            .finish()
    }
}

impl Clone for DiskCache {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl DiskCache {
    /// Read the blob stored under `key`.
    ///
    /// Any failure, including an unreadable file, degrades to a miss.
    pub async fn load(&self, key: &CacheKey) -> Option<Vec<u8>> {
        let path = self.path_of(key).ok()?;
        match fs::read(&path).await {
            Ok(data) => Some(data),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                warn!(key = %key, error = %e, "disk cache read failed, treating as miss");
                None
            }
        }
    }

    /// Write `data` under `key`, overwriting any prior blob.
    ///
    /// Failures are logged and swallowed; a cache write must never fail the
    /// caller's save or display path. Triggers a capacity sweep when the
    /// write pushes usage over budget.
    pub async fn store(&self, key: &CacheKey, data: &[u8]) {
        if let Err(e) = self.try_store(key, data).await {
            warn!(key = %key, error = %e, "disk cache write failed, dropping entry");
        }
    }

    async fn try_store(&self, key: &CacheKey, data: &[u8]) -> Result<()> {
        let path = self.path_of(key)?;

        // Write to a per-writer temp file, then rename. Readers never see a
        // partial blob.
        let nonce = TMP_NONCE.fetch_add(1, Ordering::Relaxed);
        let tmp = self.shared.dir.join(format!(".{nonce}.tmp"));
        fs::write(&tmp, data).await?;

        let replaced = file_len(&path).await;
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        self.shared.size.fetch_add(data.len() as u64, Ordering::Relaxed);
        if replaced > 0 {
            self.shared.size.fetch_sub(replaced, Ordering::Relaxed);
        }

        if self.size() > self.shared.capacity {
            self.sweep().await;
        }
        Ok(())
    }

    /// Delete the blobs for exactly the given keys. Missing keys are
    /// silently ignored; other failures are logged and swallowed.
    pub async fn remove(&self, keys: &[CacheKey]) {
        for key in keys {
            let path = match self.path_of(key) {
                Ok(path) => path,
                Err(_) => continue,
            };
            let len = file_len(&path).await;
            match fs::remove_file(&path).await {
                Ok(()) => {
                    self.shared.size.fetch_sub(len, Ordering::Relaxed);
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warn!(key = %key, error = %e, "disk cache removal failed"),
            }
        }
    }

    /// Delete the entire cache contents.
    ///
    /// Unlike the other operations this propagates the error: the caller
    /// may need to know that clearing failed.
    pub async fn clear(&self) -> Result<()> {
        let mut entries = fs::read_dir(&self.shared.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let Ok(metadata) = entry.metadata().await else {
                continue;
            };
            if !metadata.is_file() {
                continue;
            }
            if let Err(e) = fs::remove_file(&path).await {
                if e.kind() != ErrorKind::NotFound {
                    return Err(e.into());
                }
            }
        }
        self.shared.size.store(0, Ordering::Relaxed);
        Ok(())
    }

    /// Whether a blob is stored under `key`.
    pub async fn contains(&self, key: &CacheKey) -> bool {
        match self.path_of(key) {
            Ok(path) => fs::try_exists(&path).await.unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Number of blob files under the cache directory.
    pub async fn entry_count(&self) -> usize {
        match self.scan().await {
            Ok(entries) => entries.len(),
            Err(e) => {
                warn!(error = %e, "disk cache scan failed");
                0
            }
        }
    }

    /// Approximate total size of the stored blobs, in bytes.
    pub fn size(&self) -> u64 {
        self.shared.size.load(Ordering::Relaxed)
    }

    /// Total-size budget, in bytes.
    pub fn capacity(&self) -> u64 {
        self.shared.capacity
    }

    /// Remove oldest entries until usage is back under the low watermark.
    ///
    /// Entries are ordered by file modification time, which is their
    /// insertion time: reads do not refresh the stamp. At most one sweep
    /// runs at a time; callers racing an in-flight sweep return
    /// immediately.
    pub async fn sweep(&self) {
        if self.shared.sweeping.swap(true, Ordering::AcqRel) {
            return;
        }

        let target = (self.shared.capacity as f64 * SWEEP_LOW_WATERMARK) as u64;
        let mut freed = 0u64;
        let mut removed = 0usize;

        match self.scan().await {
            Ok(entries) => {
                let oldest_first = entries.into_iter().sorted_by_key(|e| e.modified).collect_vec();
                for entry in oldest_first {
                    if self.size() <= target {
                        break;
                    }
                    match fs::remove_file(&entry.path).await {
                        Ok(()) => {
                            self.shared.size.fetch_sub(entry.len, Ordering::Relaxed);
                            freed += entry.len;
                            removed += 1;
                        }
                        Err(e) if e.kind() == ErrorKind::NotFound => {}
                        Err(e) => warn!(path = ?entry.path, error = %e, "disk cache sweep removal failed"),
                    }
                }
            }
            Err(e) => warn!(error = %e, "disk cache sweep scan failed"),
        }

        self.shared.sweeping.store(false, Ordering::Release);

        if removed > 0 {
            debug!(removed, freed, size = self.size(), "disk cache sweep");
        }
    }

    async fn scan(&self) -> Result<Vec<ScanEntry>> {
        let mut out = Vec::new();
        let mut entries = fs::read_dir(&self.shared.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(FILE_EXT) {
                continue;
            }
            let Ok(metadata) = entry.metadata().await else {
                continue;
            };
            if !metadata.is_file() {
                continue;
            }
            out.push(ScanEntry {
                path,
                len: metadata.len(),
                modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            });
        }
        Ok(out)
    }

    fn path_of(&self, key: &CacheKey) -> Result<PathBuf> {
        let raw = key.as_str();
        if raw.is_empty() || raw.contains(['/', '\\']) || raw.contains("..") {
            return Err(Error::InvalidKey(raw.to_string()));
        }
        Ok(self.shared.dir.join(format!("{raw}.{FILE_EXT}")))
    }
}

struct ScanEntry {
    path: PathBuf,
    len: u64,
    modified: SystemTime,
}

async fn file_len(path: &Path) -> u64 {
    match fs::metadata(path).await {
        Ok(metadata) => metadata.len(),
        Err(_) => 0,
    }
}

/// Builder of [`DiskCache`].
pub struct DiskCacheBuilder {
    dir: PathBuf,
    capacity: u64,
}

impl DiskCacheBuilder {
    /// Create a builder rooted at `dir`. The directory is created on
    /// build if it does not exist.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            capacity: DEFAULT_CAPACITY,
        }
    }

    /// Set the total-size budget, in bytes.
    pub fn with_capacity(mut self, capacity: u64) -> Self {
        self.capacity = capacity;
        self
    }

    /// Open the cache: create the directory, rebuild the size ledger from
    /// the files found there, and sweep once so a budget lowered between
    /// runs takes effect immediately.
    pub async fn build(self) -> Result<DiskCache> {
        fs::create_dir_all(&self.dir).await?;

        let cache = DiskCache {
            shared: Arc::new(Shared {
                dir: self.dir,
                capacity: self.capacity,
                size: AtomicU64::new(0),
                sweeping: AtomicBool::new(false),
            }),
        };

        let recovered: u64 = cache.scan().await?.iter().map(|e| e.len).sum();
        cache.shared.size.store(recovered, Ordering::Relaxed);
        debug!(dir = ?cache.shared.dir, size = recovered, "disk cache recovered");

        if cache.size() > cache.capacity() {
            cache.sweep().await;
        }
        Ok(cache)
    }
}
