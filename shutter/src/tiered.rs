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

use std::{fmt::Debug, path::PathBuf, sync::Arc};

use image::DynamicImage;
use shutter_common::{
    asyncify::asyncify,
    key::{CacheKey, PixelSize, TargetSize},
};
use shutter_memory::{MemoryCache, MemoryCacheBuilder, Weighter};
use shutter_storage::{DiskCache, DiskCacheBuilder};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::{
    codec::{self, EncoderConfig, DISK_BLOB_QUALITY},
    error::Result,
};

/// Thumbnail pixel sizes rendered by the default UI configuration.
///
/// The invalidation coordinator reconstructs disk keys from this list, so
/// it must stay in sync with every target size the pipeline is invoked
/// with; sizes missing here leave orphaned disk entries that only the
/// capacity sweep reclaims.
pub const DEFAULT_KNOWN_SIZES: [PixelSize; 3] = [
    PixelSize::new(220, 240),
    PixelSize::new(330, 360),
    PixelSize::new(600, 600),
];

/// Builder of [`TieredImageCache`].
pub struct TieredImageCacheBuilder;

impl Default for TieredImageCacheBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TieredImageCacheBuilder {
    /// Create a builder.
    pub fn new() -> Self {
        Self
    }

    /// Configure the memory tier with an entry-count budget (around 50 for
    /// a scrolling photo grid).
    pub fn memory(self, capacity: usize) -> TieredImageCacheBuilderPhaseMemory {
        TieredImageCacheBuilderPhaseMemory {
            builder: MemoryCacheBuilder::new(capacity)
                .with_weighter(|_, image: &Arc<DynamicImage>| bitmap_charge(image)),
        }
    }
}

/// Memory phase of the tiered cache builder.
pub struct TieredImageCacheBuilderPhaseMemory {
    builder: MemoryCacheBuilder<CacheKey, Arc<DynamicImage>>,
}

impl TieredImageCacheBuilderPhaseMemory {
    /// Also bound the memory tier by total bitmap bytes.
    pub fn with_charge_capacity(self, charge_capacity: usize) -> Self {
        Self {
            builder: self.builder.with_charge_capacity(charge_capacity),
        }
    }

    /// Replace the default `width * height * 4` bitmap weighter.
    pub fn with_weighter(self, weighter: impl Weighter<CacheKey, Arc<DynamicImage>>) -> Self {
        Self {
            builder: self.builder.with_weighter(weighter),
        }
    }

    /// Configure the disk tier rooted at `dir`.
    pub fn storage(self, dir: impl Into<PathBuf>) -> TieredImageCacheBuilderPhaseStorage {
        TieredImageCacheBuilderPhaseStorage {
            memory: self.builder.build(),
            builder: DiskCacheBuilder::new(dir),
            known_sizes: DEFAULT_KNOWN_SIZES.to_vec(),
            encoder: EncoderConfig::default(),
        }
    }
}

/// Storage phase of the tiered cache builder.
pub struct TieredImageCacheBuilderPhaseStorage {
    memory: MemoryCache<CacheKey, Arc<DynamicImage>>,
    builder: DiskCacheBuilder,
    known_sizes: Vec<PixelSize>,
    encoder: EncoderConfig,
}

impl TieredImageCacheBuilderPhaseStorage {
    /// Set the disk tier's total-size budget, in bytes.
    pub fn with_disk_capacity(self, capacity: u64) -> Self {
        Self {
            memory: self.memory,
            builder: self.builder.with_capacity(capacity),
            known_sizes: self.known_sizes,
            encoder: self.encoder,
        }
    }

    /// Replace the known thumbnail sizes used for disk-key reconstruction.
    pub fn with_known_sizes(mut self, sizes: impl IntoIterator<Item = PixelSize>) -> Self {
        self.known_sizes = sizes.into_iter().collect();
        self
    }

    /// Replace the budgeted-encoder configuration.
    pub fn with_encoder_config(mut self, encoder: EncoderConfig) -> Self {
        self.encoder = encoder;
        self
    }

    /// Open the disk tier and assemble the cache.
    pub async fn build(self) -> Result<TieredImageCache> {
        let disk = self.builder.build().await?;
        Ok(TieredImageCache {
            memory: self.memory,
            disk,
            known_sizes: self.known_sizes.into(),
            encoder: self.encoder,
        })
    }
}

/// Two-tier image cache with an on-demand downsampling pipeline.
///
/// Lookup precedence is memory, then disk, then an actual decode and
/// downsample of the source bytes, populating both tiers on the way out.
/// The memory tier is authoritative when populated; the disk tier is only
/// consulted on a memory miss.
pub struct TieredImageCache {
    memory: MemoryCache<CacheKey, Arc<DynamicImage>>,
    disk: DiskCache,
    known_sizes: Arc<[PixelSize]>,
    encoder: EncoderConfig,
}

impl Debug for TieredImageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TieredImageCache")
            .field("memory", &self.memory)
            .field("disk", &self.disk)
            .finish()
    }
}

impl Clone for TieredImageCache {
    fn clone(&self) -> Self {
        Self {
            memory: self.memory.clone(),
            disk: self.disk.clone(),
            known_sizes: self.known_sizes.clone(),
            encoder: self.encoder.clone(),
        }
    }
}

impl TieredImageCache {
    /// The memory tier.
    pub fn memory(&self) -> &MemoryCache<CacheKey, Arc<DynamicImage>> {
        &self.memory
    }

    /// The disk tier.
    pub fn disk(&self) -> &DiskCache {
        &self.disk
    }

    /// The known thumbnail sizes used for disk-key reconstruction.
    pub fn known_sizes(&self) -> &[PixelSize] {
        &self.known_sizes
    }

    /// The budgeted-encoder configuration.
    pub fn encoder_config(&self) -> &EncoderConfig {
        &self.encoder
    }

    /// Produce a bitmap of `entity_id`'s source bytes sized for `target`.
    ///
    /// Consults the memory tier, then the disk tier, and only then decodes
    /// and downsamples `raw`. Both tiers are populated on the way out; the
    /// disk write happens off the critical path and its failure is
    /// swallowed. Returns [`Error::Decode`](crate::Error::Decode) only
    /// when no tier holds the artifact and `raw` is undecodable.
    pub async fn fetch(&self, raw: &[u8], target: TargetSize, entity_id: &str) -> Result<Arc<DynamicImage>> {
        let size = target.pixels();
        let key = CacheKey::downsample(entity_id, size);

        if let Some(image) = self.memory.get(&key) {
            return Ok(image);
        }

        if let Some(blob) = self.disk.load(&key).await {
            match asyncify(move || codec::decode(&blob)).await {
                Ok(image) => {
                    let image = Arc::new(image);
                    self.memory.insert(key, image.clone());
                    return Ok(image);
                }
                // A corrupt blob must not fail the display path while the
                // source bytes can still be downsampled.
                Err(e) => warn!(key = %key, error = %e, "disk blob undecodable, regenerating"),
            }
        }

        let raw = raw.to_vec();
        let image = asyncify(move || codec::downsample(&raw, size)).await?;
        let image = Arc::new(image);
        self.memory.insert(key.clone(), image.clone());

        let disk = self.disk.clone();
        let blob_source = image.clone();
        tokio::spawn(async move {
            match asyncify(move || codec::encode_jpeg(&blob_source, DISK_BLOB_QUALITY)).await {
                Ok(blob) => disk.store(&key, &blob).await,
                Err(e) => warn!(key = %key, error = %e, "disk blob encode failed, skipping store"),
            }
        });

        Ok(image)
    }

    /// Compress a captured photo to fit the configured byte budget.
    ///
    /// The write-path companion of [`fetch`](Self::fetch): the result is
    /// what the persistence layer stores as the photo's source bytes.
    pub async fn compress(&self, image: Arc<DynamicImage>) -> Result<Vec<u8>> {
        let config = self.encoder.clone();
        asyncify(move || codec::encode_within_budget(&image, &config)).await
    }

    /// Purge every cached artifact of the given entities.
    ///
    /// Memory entries are removed synchronously, before this returns, so a
    /// re-render after the owning records' deletion cannot show a stale
    /// bitmap. Disk entries are removed by a spawned task: their keys are
    /// reconstructed from the known thumbnail sizes, and the returned
    /// handle may be dropped (fire-and-forget) or awaited by tests. A disk
    /// write racing the removal may leave a stale blob behind; the window
    /// is bounded by the next sweep or re-invalidation.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn invalidate<I, S>(&self, entity_ids: I) -> JoinHandle<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let ids: Vec<String> = entity_ids.into_iter().map(|id| id.as_ref().to_string()).collect();

        let removed = self
            .memory
            .remove_matching(|key| ids.iter().any(|id| key.has_prefix(id)));
        debug!(?ids, removed, "purged memory entries");

        let keys: Vec<CacheKey> = ids
            .iter()
            .flat_map(|id| self.known_sizes.iter().map(move |size| CacheKey::downsample(id, *size)))
            .collect();
        let disk = self.disk.clone();
        tokio::spawn(async move {
            disk.remove(&keys).await;
        })
    }

    /// Clear both tiers.
    ///
    /// The memory tier cannot fail; a disk tier that cannot be cleared
    /// propagates its storage error.
    pub async fn clear(&self) -> Result<()> {
        self.memory.clear();
        self.disk.clear().await?;
        Ok(())
    }
}

/// Approximate resident cost of a decoded bitmap.
fn bitmap_charge(image: &DynamicImage) -> usize {
    (image.width() as usize) * (image.height() as usize) * 4
}
