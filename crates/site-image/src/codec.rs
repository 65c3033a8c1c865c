//! Downscale and JPEG re-encode
//!
//! The output is bounded two ways: the largest side is clamped to the preset,
//! and the lossy re-encode keeps realistic photos well below the field
//! ceiling. Anything still above the ceiling is rejected, never truncated.

use crate::error::{ImageError, ImageResult};
use crate::preset::{SizePreset, ICON_MAX_DIMENSION, PHOTO_MAX_DIMENSION};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use site_model::EncodedImage;
use std::path::Path;

/// JPEG quality (0.7 on a 0–1 scale)
pub const DEFAULT_JPEG_QUALITY: u8 = 70;

pub use site_model::MAX_ENCODED_BYTES;

const OUTPUT_MEDIA_TYPE: &str = "image/jpeg";

/// Image re-encoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageCodec {
    quality: u8,
    max_encoded_bytes: usize,
    photo_max_dimension: u32,
    icon_max_dimension: u32,
}

impl ImageCodec {
    /// Codec with the default quality, budget and presets
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With JPEG quality (clamped to 1..=100)
    #[inline]
    #[must_use]
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality.clamp(1, 100);
        self
    }

    /// With the encoded-size budget in bytes, never above [`MAX_ENCODED_BYTES`]
    #[inline]
    #[must_use]
    pub fn with_max_encoded_bytes(mut self, limit: usize) -> Self {
        self.max_encoded_bytes = limit.min(MAX_ENCODED_BYTES);
        self
    }

    /// With the largest dimension for a preset (at least 1 px)
    #[inline]
    #[must_use]
    pub fn with_max_dimension(mut self, preset: SizePreset, pixels: u32) -> Self {
        let pixels = pixels.max(1);
        match preset {
            SizePreset::Photo => self.photo_max_dimension = pixels,
            SizePreset::Icon => self.icon_max_dimension = pixels,
        }
        self
    }

    /// JPEG quality in use
    #[inline]
    #[must_use]
    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Encoded-size budget in bytes
    #[inline]
    #[must_use]
    pub fn max_encoded_bytes(&self) -> usize {
        self.max_encoded_bytes
    }

    /// Largest output dimension for a preset
    #[inline]
    #[must_use]
    pub fn max_dimension(&self, preset: SizePreset) -> u32 {
        match preset {
            SizePreset::Photo => self.photo_max_dimension,
            SizePreset::Icon => self.icon_max_dimension,
        }
    }

    /// Read a file and encode it
    ///
    /// # Errors
    /// `Io` if the file cannot be read, otherwise as [`ImageCodec::encode`]
    pub async fn encode_file(
        &self,
        path: impl AsRef<Path>,
        preset: SizePreset,
    ) -> ImageResult<EncodedImage> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ImageError::io_error(path, e))?;
        self.encode(bytes, preset).await
    }

    /// Encode raw file bytes on the blocking pool
    ///
    /// # Errors
    /// `Decode` for unreadable input, `PayloadTooLarge` if the result is over
    /// budget, `Encode` if the encoder or worker fails
    pub async fn encode(&self, bytes: Vec<u8>, preset: SizePreset) -> ImageResult<EncodedImage> {
        let codec = *self;
        tokio::task::spawn_blocking(move || codec.encode_blocking(&bytes, preset))
            .await
            .map_err(|e| ImageError::Encode(format!("encoder task failed: {e}")))?
    }

    /// Encode raw file bytes on the current thread
    ///
    /// # Errors
    /// As [`ImageCodec::encode`]
    pub fn encode_blocking(&self, bytes: &[u8], preset: SizePreset) -> ImageResult<EncodedImage> {
        let source =
            image::load_from_memory(bytes).map_err(|e| ImageError::Decode(e.to_string()))?;
        let (width, height) = source.dimensions();
        let bounded = self.bound(source, self.max_dimension(preset));
        let jpeg = self.to_jpeg(&bounded)?;

        let encoded = EncodedImage::from_base64(OUTPUT_MEDIA_TYPE, &STANDARD.encode(&jpeg));
        if encoded.len() > self.max_encoded_bytes {
            tracing::warn!(
                size = encoded.len(),
                limit = self.max_encoded_bytes,
                "encoded image over budget"
            );
            return Err(ImageError::PayloadTooLarge {
                size: encoded.len(),
                limit: self.max_encoded_bytes,
            });
        }

        tracing::debug!(
            width,
            height,
            out_width = bounded.width(),
            out_height = bounded.height(),
            bytes = encoded.len(),
            %preset,
            "image encoded"
        );
        Ok(encoded)
    }

    /// Downscale so the largest side is at most `max`; smaller images pass through
    fn bound(&self, image: DynamicImage, max: u32) -> DynamicImage {
        if image.width().max(image.height()) > max {
            image.resize(max, max, FilterType::Triangle)
        } else {
            image
        }
    }

    fn to_jpeg(&self, image: &DynamicImage) -> ImageResult<Vec<u8>> {
        // JPEG has no alpha channel
        let rgb = image.to_rgb8();
        let mut out = Vec::new();
        JpegEncoder::new_with_quality(&mut out, self.quality)
            .encode_image(&rgb)
            .map_err(|e| ImageError::Encode(e.to_string()))?;
        Ok(out)
    }
}

impl Default for ImageCodec {
    fn default() -> Self {
        Self {
            quality: DEFAULT_JPEG_QUALITY,
            max_encoded_bytes: MAX_ENCODED_BYTES,
            photo_max_dimension: PHOTO_MAX_DIMENSION,
            icon_max_dimension: ICON_MAX_DIMENSION,
        }
    }
}

/// Decode a stored inline image
///
/// # Errors
/// `Decode` if the payload is not base64 or not an image
pub fn decode_encoded(image: &EncodedImage) -> ImageResult<DynamicImage> {
    let bytes = STANDARD
        .decode(image.payload())
        .map_err(|e| ImageError::Decode(format!("invalid base64 payload: {e}")))?;
    image::load_from_memory(&bytes).map_err(|e| ImageError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, ImageFormat, Rgb, Rgba};
    use proptest::prelude::*;
    use std::io::Cursor;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    fn noisy_png(width: u32, height: u32) -> Vec<u8> {
        let mut state: u32 = 0x9E37_79B9;
        let img: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_fn(width, height, |_, _| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            let [a, b, c, _] = state.to_le_bytes();
            Rgb([a, b, c])
        });
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[tokio::test]
    async fn large_photo_is_bounded() {
        let codec = ImageCodec::new();
        let encoded = codec.encode(png(5000, 3000), SizePreset::Photo).await.unwrap();

        assert_eq!(encoded.media_type(), "image/jpeg");
        assert!(encoded.len() < MAX_ENCODED_BYTES);

        let decoded = decode_encoded(&encoded).unwrap();
        assert_eq!(decoded.width(), 800);
        assert_eq!(decoded.height(), 480);
    }

    #[test]
    fn small_image_is_not_upscaled() {
        let codec = ImageCodec::new();
        let encoded = codec.encode_blocking(&png(320, 200), SizePreset::Photo).unwrap();
        let decoded = decode_encoded(&encoded).unwrap();
        assert_eq!(decoded.dimensions(), (320, 200));
    }

    #[test]
    fn icon_preset_uses_smaller_bound() {
        let codec = ImageCodec::new();
        let encoded = codec.encode_blocking(&png(512, 256), SizePreset::Icon).unwrap();
        let decoded = decode_encoded(&encoded).unwrap();
        assert_eq!(decoded.dimensions(), (128, 64));
    }

    #[test]
    fn alpha_is_flattened() {
        let img: ImageBuffer<Rgba<u8>, Vec<u8>> =
            ImageBuffer::from_fn(16, 16, |x, _| Rgba([255, 0, 0, (x * 16) as u8]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();

        let encoded = ImageCodec::new()
            .encode_blocking(out.get_ref(), SizePreset::Photo)
            .unwrap();
        assert_eq!(decode_encoded(&encoded).unwrap().dimensions(), (16, 16));
    }

    #[test]
    fn corrupt_input_is_decode_failure() {
        let err = ImageCodec::new()
            .encode_blocking(b"definitely not an image", SizePreset::Photo)
            .unwrap_err();
        assert!(err.is_decode_failure());
    }

    #[test]
    fn over_budget_is_rejected_not_truncated() {
        let codec = ImageCodec::new().with_max_encoded_bytes(2_000);
        let err = codec
            .encode_blocking(&noisy_png(400, 400), SizePreset::Photo)
            .unwrap_err();
        match err {
            ImageError::PayloadTooLarge { size, limit } => {
                assert_eq!(limit, 2_000);
                assert!(size > limit);
            }
            other => panic!("expected PayloadTooLarge, got {other:?}"),
        }
    }

    #[test]
    fn budget_never_exceeds_store_ceiling() {
        let codec = ImageCodec::new().with_max_encoded_bytes(8 * MAX_ENCODED_BYTES);
        assert_eq!(codec.max_encoded_bytes(), MAX_ENCODED_BYTES);
    }

    #[test]
    fn lower_quality_is_smaller() {
        let input = noisy_png(200, 200);
        let high = ImageCodec::new()
            .with_quality(100)
            .encode_blocking(&input, SizePreset::Photo)
            .unwrap();
        let default = ImageCodec::new()
            .encode_blocking(&input, SizePreset::Photo)
            .unwrap();
        assert!(default.len() < high.len());
    }

    #[test]
    fn builder_clamps() {
        let codec = ImageCodec::new()
            .with_quality(0)
            .with_max_dimension(SizePreset::Icon, 0);
        assert_eq!(codec.quality(), 1);
        assert_eq!(codec.max_dimension(SizePreset::Icon), 1);
        assert_eq!(codec.max_dimension(SizePreset::Photo), PHOTO_MAX_DIMENSION);
    }

    #[test]
    fn decode_rejects_bad_payload() {
        let bogus = EncodedImage::from_base64("image/jpeg", "!!!not-base64!!!");
        assert!(decode_encoded(&bogus).unwrap_err().is_decode_failure());
    }

    #[tokio::test]
    async fn encode_file_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ImageCodec::new()
            .encode_file(dir.path().join("missing.png"), SizePreset::Photo)
            .await
            .unwrap_err();
        assert!(matches!(err, ImageError::Io { .. }));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_largest_side_is_clamped(width in 1u32..400, height in 1u32..400, max in 16u32..200) {
            let codec = ImageCodec::new().with_max_dimension(SizePreset::Photo, max);
            let encoded = codec.encode_blocking(&png(width, height), SizePreset::Photo).unwrap();
            let (w, h) = decode_encoded(&encoded).unwrap().dimensions();

            if width.max(height) <= max {
                prop_assert_eq!((w, h), (width, height));
            } else {
                prop_assert_eq!(w.max(h), max);
            }
        }
    }
}
