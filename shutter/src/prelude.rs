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

pub use shutter_common::{
    asyncify::asyncify,
    code::{Key, Value},
    key::{CacheKey, PixelSize, TargetSize},
};
pub use shutter_memory::{MemoryCache, MemoryCacheBuilder, MemoryStats, Weighter};
pub use shutter_storage::{DiskCache, DiskCacheBuilder, Error as StorageError};

pub use crate::{
    codec::{encode_within_budget, EncoderConfig},
    error::{Error, Result},
    tiered::{
        TieredImageCache, TieredImageCacheBuilder, TieredImageCacheBuilderPhaseMemory,
        TieredImageCacheBuilderPhaseStorage, DEFAULT_KNOWN_SIZES,
    },
};
