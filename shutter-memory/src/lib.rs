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

//! In-memory LRU cache tier for shutter.
//!
//! Bounds the resident set of decoded bitmaps while maximizing hit rate for
//! recently viewed entries. All operations are synchronous and serialized;
//! none of them can fail.

mod cache;

pub use cache::{MemoryCache, MemoryCacheBuilder, MemoryStats, Weighter};
