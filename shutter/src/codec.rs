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

use image::{codecs::jpeg::JpegEncoder, DynamicImage};
use serde::{Deserialize, Serialize};
use shutter_common::key::PixelSize;

use crate::error::{Error, Result};

/// Quality of the pre-downsampled blobs the pipeline writes to the disk
/// tier. Thumbnail-sized, so quality wins over a few extra KB.
pub(crate) const DISK_BLOB_QUALITY: u8 = 80;

/// Configuration of the budgeted encoder used by the photo write path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncoderConfig {
    /// Lower bound of the searched quality range.
    pub min_quality: f32,
    /// Upper bound of the searched quality range.
    pub max_quality: f32,
    /// Number of bisection steps.
    pub iterations: u32,
    /// Encoded-size budget, in bytes.
    pub byte_budget: usize,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            min_quality: 0.45,
            max_quality: 0.92,
            iterations: 7,
            byte_budget: 2_000_000,
        }
    }
}

/// Decode `bytes` into a bitmap.
pub(crate) fn decode(bytes: &[u8]) -> Result<DynamicImage> {
    image::load_from_memory(bytes).map_err(Error::Decode)
}

/// Decode `bytes` and reduce the bitmap to fit inside `target`, preserving
/// aspect ratio. Images already inside the box are returned as decoded.
///
/// Uses the nearest-area sampling path, the cheapest reduction the decoder
/// offers; the source is never resampled above the target resolution.
pub(crate) fn downsample(bytes: &[u8], target: PixelSize) -> Result<DynamicImage> {
    let image = decode(bytes)?;
    if image.width() <= target.width && image.height() <= target.height {
        return Ok(image);
    }
    Ok(image.thumbnail(target.width, target.height))
}

pub(crate) fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    // JPEG carries no alpha channel.
    let rgb = image.to_rgb8();
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality)
        .encode_image(&rgb)
        .map_err(Error::Encode)?;
    Ok(buf)
}

/// Encode `image` as JPEG at the highest quality whose output fits the
/// byte budget.
///
/// Bisects the configured quality range instead of walking discrete
/// steps, so the number of encodes is bounded by `iterations`. When even
/// the lowest quality overflows the budget, that lowest-quality encoding
/// is returned anyway; the caller asked for the smallest artifact the
/// encoder can produce, not a failure.
pub fn encode_within_budget(image: &DynamicImage, config: &EncoderConfig) -> Result<Vec<u8>> {
    let mut lo = config.min_quality;
    let mut hi = config.max_quality;
    let mut best: Option<Vec<u8>> = None;

    for _ in 0..config.iterations {
        let quality = (lo + hi) / 2.0;
        let encoded = encode_jpeg(image, to_encoder_quality(quality))?;
        if encoded.len() <= config.byte_budget {
            best = Some(encoded);
            lo = quality;
        } else {
            hi = quality;
        }
    }

    match best {
        Some(encoded) => Ok(encoded),
        None => encode_jpeg(image, to_encoder_quality(config.min_quality)),
    }
}

fn to_encoder_quality(quality: f32) -> u8 {
    (quality * 100.0).round().clamp(1.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use image::{Rgb, RgbImage};
    use rand::{rngs::StdRng, Rng, SeedableRng};

    use super::*;

    /// Random pixels compress poorly, so encoded size strictly grows with
    /// quality.
    fn noise_image(width: u32, height: u32) -> DynamicImage {
        let mut rng = StdRng::seed_from_u64(7);
        let mut image = RgbImage::new(width, height);
        for pixel in image.pixels_mut() {
            *pixel = Rgb([rng.random(), rng.random(), rng.random()]);
        }
        DynamicImage::ImageRgb8(image)
    }

    fn gradient_image(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        }))
    }

    #[test]
    fn test_decode_error() {
        let err = decode(b"definitely not an image").unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn test_downsample_fits_target_box() {
        let bytes = encode_jpeg(&gradient_image(1000, 800), 90).unwrap();
        let image = downsample(&bytes, PixelSize::new(330, 360)).unwrap();

        assert!(image.width() <= 330);
        assert!(image.height() <= 360);
        // Aspect preserved: the wide source fills the box width.
        assert_eq!(image.width(), 330);
    }

    #[test]
    fn test_downsample_never_upscales() {
        let bytes = encode_jpeg(&gradient_image(100, 80), 90).unwrap();
        let image = downsample(&bytes, PixelSize::new(330, 360)).unwrap();
        assert_eq!((image.width(), image.height()), (100, 80));
    }

    #[test]
    fn test_budget_search_picks_quality_above_floor() {
        let image = noise_image(256, 256);
        let full = encode_jpeg(&image, 92).unwrap();
        let floor = encode_jpeg(&image, 45).unwrap();
        assert!(floor.len() < full.len());

        // A budget between the floor and the full encoding forces the
        // search below 0.92 but keeps it above 0.45.
        let config = EncoderConfig {
            byte_budget: (floor.len() + full.len()) / 2,
            ..EncoderConfig::default()
        };
        let encoded = encode_within_budget(&image, &config).unwrap();

        assert!(encoded.len() <= config.byte_budget);
        assert!(encoded.len() > floor.len());
    }

    #[test]
    fn test_budget_search_falls_back_to_floor() {
        let image = noise_image(256, 256);
        let floor = encode_jpeg(&image, 45).unwrap();

        // Even the floor quality overflows this budget; the floor encoding
        // is returned regardless.
        let config = EncoderConfig {
            byte_budget: floor.len() / 2,
            ..EncoderConfig::default()
        };
        let encoded = encode_within_budget(&image, &config).unwrap();

        assert!(encoded.len() > config.byte_budget);
        assert_eq!(encoded.len(), floor.len());
    }

    #[test]
    fn test_budget_search_keeps_generous_budget_at_top_quality() {
        let image = noise_image(64, 64);
        let config = EncoderConfig::default();
        let encoded = encode_within_budget(&image, &config).unwrap();
        assert!(encoded.len() <= config.byte_budget);
    }
}
