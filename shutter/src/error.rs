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

/// Error of the shutter facade.
///
/// Cache misses are not errors; they are absent results. Disk failures
/// inside the pipeline never surface here: reads degrade to misses and
/// writes are logged and swallowed. Only the inability to produce the
/// requested artifact at all, or an explicit `clear`, reaches the caller.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Source bytes are not a decodable image. The caller shows a
    /// placeholder.
    #[error("decode error: {0}")]
    Decode(#[source] image::ImageError),
    /// No attempted quality produced any output. The enclosing save is
    /// aborted.
    #[error("encode error: {0}")]
    Encode(#[source] image::ImageError),
    /// Disk tier failure, surfaced from `clear` only.
    #[error("storage error: {0}")]
    Storage(#[from] shutter_storage::Error),
    /// Other error.
    #[error("other error: {0}")]
    Other(#[from] anyhow::Error),
}

/// Result type of the shutter facade.
pub type Result<T> = core::result::Result<T, Error>;
