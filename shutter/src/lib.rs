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

//! shutter - tiered image cache for Rust.
//!
//! A size-bounded in-memory LRU tier of decoded bitmaps over a
//! size-bounded persistent tier of downsampled blobs, fed by an on-demand
//! downsampling pipeline and kept consistent with the primary store by a
//! group invalidation protocol.
//!
//! ```rust,no_run
//! use shutter::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let cache = TieredImageCacheBuilder::new()
//!         .memory(50)
//!         .storage("/tmp/shutter")
//!         .build()
//!         .await?;
//!
//!     let raw = std::fs::read("photo.jpg")?;
//!     let target = TargetSize::new(110.0, 120.0, 3.0);
//!     let bitmap = cache.fetch(&raw, target, "photo-1234").await?;
//!     drop(bitmap);
//!
//!     let _ = cache.invalidate(["photo-1234"]);
//!     Ok(())
//! }
//! ```

mod codec;
mod error;
mod tiered;

/// The public surface of the crate.
pub mod prelude;

pub use prelude::*;
