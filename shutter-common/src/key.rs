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

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// Pixel dimensions of a rendering target, after the display scale factor
/// has been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl PixelSize {
    /// Create a pixel size.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Display for PixelSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A display target in logical points plus the display scale factor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetSize {
    /// Width in points.
    pub width: f32,
    /// Height in points.
    pub height: f32,
    /// Display scale factor (e.g. `3.0` on a 3x display).
    pub scale: f32,
}

impl TargetSize {
    /// Create a target size.
    pub fn new(width: f32, height: f32, scale: f32) -> Self {
        Self { width, height, scale }
    }

    /// Pixel dimensions after applying the scale factor, rounded to whole
    /// pixels.
    pub fn pixels(&self) -> PixelSize {
        PixelSize::new(
            (self.width * self.scale).round() as u32,
            (self.height * self.scale).round() as u32,
        )
    }
}

/// Key of a cached artifact.
///
/// The textual form is `"<entityID>_downsample_<w>x<h>"`. The format is
/// stable: every key of an owning entity starts with that entity's
/// identifier, so all of its artifacts can be removed as a group with a
/// prefix scan, and the disk tier can reconstruct keys from an identifier
/// and the set of rendered sizes without a reverse index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey(String);

impl CacheKey {
    const DOWNSAMPLE_TAG: &'static str = "_downsample_";

    /// Key of the downsampled variant of `entity_id` at `size`.
    pub fn downsample(entity_id: &str, size: PixelSize) -> Self {
        Self(format!("{entity_id}{}{size}", Self::DOWNSAMPLE_TAG))
    }

    /// Wrap an already formatted key.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The textual form of the key.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this key belongs to the group identified by `prefix`.
    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_size_pixels() {
        let target = TargetSize::new(110.0, 120.0, 3.0);
        assert_eq!(target.pixels(), PixelSize::new(330, 360));

        let target = TargetSize::new(110.0, 120.0, 2.0);
        assert_eq!(target.pixels(), PixelSize::new(220, 240));
    }

    #[test]
    fn test_target_size_rounding() {
        // 2.61x scale factors produce fractional pixel sizes.
        let target = TargetSize::new(100.0, 100.0, 2.61);
        assert_eq!(target.pixels(), PixelSize::new(261, 261));
    }

    #[test]
    fn test_key_format() {
        let key = CacheKey::downsample("photoA", PixelSize::new(330, 360));
        assert_eq!(key.as_str(), "photoA_downsample_330x360");
    }

    #[test]
    fn test_key_prefix() {
        let key = CacheKey::downsample("photoA", PixelSize::new(220, 240));
        assert!(key.has_prefix("photoA"));
        assert!(!key.has_prefix("photoB"));
    }
}
