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

/// Error of the disk cache tier.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// I/O failure on the underlying storage.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Key not representable as a cache file name.
    #[error("key not storable as a file name: {0}")]
    InvalidKey(String),
    /// Other error.
    #[error("other error: {0}")]
    Other(#[from] anyhow::Error),
}

/// Result type of the disk cache tier.
pub type Result<T> = core::result::Result<T, Error>;
