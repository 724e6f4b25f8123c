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

//! Fetch the same photo three times: a cold miss, a memory hit, and a disk
//! hit after the memory tier is dropped.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use shutter::prelude::*;

fn photo_bytes() -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::from_fn(2000, 1500, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x * y) % 256) as u8])
    }));
    let mut buf = Cursor::new(Vec::new());
    image.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::DEBUG).init();

    let dir = tempfile::tempdir()?;
    let cache = TieredImageCacheBuilder::new()
        .memory(50)
        .storage(dir.path())
        .with_disk_capacity(64 * 1024 * 1024)
        .build()
        .await?;

    let raw = photo_bytes();
    let target = TargetSize::new(110.0, 120.0, 3.0);

    let bitmap = cache.fetch(&raw, target, "photo-1234").await?;
    println!("cold fetch: {}x{}", bitmap.width(), bitmap.height());

    let bitmap = cache.fetch(&raw, target, "photo-1234").await?;
    println!("memory hit: {}x{}", bitmap.width(), bitmap.height());

    // Wait for the background disk population, then drop the memory tier's
    // contents to force a disk hit.
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    cache.memory().clear();
    let bitmap = cache.fetch(&raw, target, "photo-1234").await?;
    println!("disk hit: {}x{}", bitmap.width(), bitmap.height());
    println!("stats: {:?}", cache.memory().stats());

    cache.invalidate(["photo-1234"]).await?;
    cache.clear().await?;
    Ok(())
}
