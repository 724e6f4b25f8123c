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

//! Persistent cache tier for shutter.
//!
//! Stores encoded image blobs one file per key under a flat cache
//! directory, bounded by a total-size budget enforced with oldest-first
//! sweeps. Reads degrade to cache misses on any failure; writes are logged
//! and swallowed so a cache failure never reaches the caller's critical
//! path.

mod cache;
mod error;

pub use cache::{DiskCache, DiskCacheBuilder};
pub use error::{Error, Result};
