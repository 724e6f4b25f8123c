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

use std::{io::Cursor, path::Path, sync::Arc, time::Duration};

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use shutter::prelude::*;
use tempfile::TempDir;

fn source_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    }));
    let mut buf = Cursor::new(Vec::new());
    image.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

async fn build_cache(dir: &Path, memory_capacity: usize) -> TieredImageCache {
    TieredImageCacheBuilder::new()
        .memory(memory_capacity)
        .storage(dir)
        .with_disk_capacity(64 * 1024 * 1024)
        .build()
        .await
        .unwrap()
}

/// Disk population happens off the fetch critical path; poll for it.
async fn wait_for_disk(cache: &TieredImageCache, key: &CacheKey) {
    for _ in 0..500 {
        if cache.disk().contains(key).await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("disk tier was not populated for {key}");
}

#[test_log::test(tokio::test)]
async fn test_fetch_populates_both_tiers() {
    let tmp = TempDir::new().unwrap();
    let cache = build_cache(tmp.path(), 50).await;
    let raw = source_bytes(1000, 800);

    let target = TargetSize::new(110.0, 120.0, 3.0);
    let image = cache.fetch(&raw, target, "photoX").await.unwrap();

    assert!(image.width() <= 330 && image.height() <= 360);

    let key = CacheKey::downsample("photoX", PixelSize::new(330, 360));
    assert!(cache.memory().contains(&key));
    wait_for_disk(&cache, &key).await;
}

#[test_log::test(tokio::test)]
async fn test_memory_hit_returns_cached_bitmap() {
    let tmp = TempDir::new().unwrap();
    let cache = build_cache(tmp.path(), 50).await;
    let raw = source_bytes(1000, 800);
    let target = TargetSize::new(110.0, 120.0, 3.0);

    let first = cache.fetch(&raw, target, "photoX").await.unwrap();
    let second = cache.fetch(&raw, target, "photoX").await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
}

#[test_log::test(tokio::test)]
async fn test_disk_hit_survives_memory_clear() {
    let tmp = TempDir::new().unwrap();
    let cache = build_cache(tmp.path(), 50).await;
    let target = TargetSize::new(110.0, 120.0, 3.0);
    let key = CacheKey::downsample("photoX", PixelSize::new(330, 360));

    let first = cache.fetch(&source_bytes(1000, 800), target, "photoX").await.unwrap();
    wait_for_disk(&cache, &key).await;
    cache.memory().clear();

    // Undecodable source bytes prove the result comes from the disk tier.
    let second = cache.fetch(b"junk", target, "photoX").await.unwrap();

    assert_eq!((first.width(), first.height()), (second.width(), second.height()));
    assert!(cache.memory().contains(&key));
}

#[test_log::test(tokio::test)]
async fn test_undecodable_source_is_a_decode_error() {
    let tmp = TempDir::new().unwrap();
    let cache = build_cache(tmp.path(), 50).await;

    let err = cache
        .fetch(b"junk", TargetSize::new(110.0, 120.0, 3.0), "photoZ")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Decode(_)));
}

#[test_log::test(tokio::test)]
async fn test_invalidate_purges_both_tiers() {
    let tmp = TempDir::new().unwrap();
    let cache = build_cache(tmp.path(), 50).await;
    let raw = source_bytes(1000, 800);

    // photoX at two known sizes, photoY at one.
    cache.fetch(&raw, TargetSize::new(110.0, 120.0, 3.0), "photoX").await.unwrap();
    cache.fetch(&raw, TargetSize::new(200.0, 200.0, 3.0), "photoX").await.unwrap();
    cache.fetch(&raw, TargetSize::new(110.0, 120.0, 3.0), "photoY").await.unwrap();

    let kx1 = CacheKey::downsample("photoX", PixelSize::new(330, 360));
    let kx2 = CacheKey::downsample("photoX", PixelSize::new(600, 600));
    let ky = CacheKey::downsample("photoY", PixelSize::new(330, 360));
    for key in [&kx1, &kx2, &ky] {
        wait_for_disk(&cache, key).await;
    }

    let handle = cache.invalidate(["photoX"]);

    // The memory purge is synchronous; a re-render cannot see photoX.
    assert!(!cache.memory().contains(&kx1));
    assert!(!cache.memory().contains(&kx2));
    assert!(cache.memory().contains(&ky));

    handle.await.unwrap();

    assert!(!cache.disk().contains(&kx1).await);
    assert!(!cache.disk().contains(&kx2).await);
    assert!(cache.disk().contains(&ky).await);
}

#[test_log::test(tokio::test)]
async fn test_clear_empties_both_tiers() {
    let tmp = TempDir::new().unwrap();
    let cache = build_cache(tmp.path(), 50).await;
    let raw = source_bytes(1000, 800);
    let key = CacheKey::downsample("photoX", PixelSize::new(330, 360));

    cache.fetch(&raw, TargetSize::new(110.0, 120.0, 3.0), "photoX").await.unwrap();
    wait_for_disk(&cache, &key).await;

    cache.clear().await.unwrap();

    assert!(cache.memory().is_empty());
    assert!(!cache.disk().contains(&key).await);
    assert_eq!(cache.disk().size(), 0);
}

#[test_log::test(tokio::test(flavor = "multi_thread", worker_threads = 4))]
async fn test_concurrent_fetches_keep_memory_bounded() {
    let tmp = TempDir::new().unwrap();
    let cache = build_cache(tmp.path(), 16).await;
    let raw = Arc::new(source_bytes(640, 480));

    let mut handles = Vec::new();
    for task in 0..8 {
        let cache = cache.clone();
        let raw = raw.clone();
        handles.push(tokio::spawn(async move {
            for i in 0..24 {
                let entity = format!("photo{}", (task * 5 + i) % 12);
                let target = if i % 2 == 0 {
                    TargetSize::new(110.0, 120.0, 2.0)
                } else {
                    TargetSize::new(110.0, 120.0, 3.0)
                };
                cache.fetch(&raw, target, &entity).await.unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert!(cache.memory().len() <= 16);
    // The LRU order structure references exactly the live keys.
    let order = cache.memory().least_recently_used(usize::MAX);
    assert_eq!(order.len(), cache.memory().len());
    for key in &order {
        assert!(cache.memory().contains(key));
    }
}
