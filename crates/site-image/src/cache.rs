//! Content-addressed ingestion cache using moka
//!
//! Encoded results are keyed by the BLAKE3 hash of the source bytes and the
//! preset, and weighed by their encoded length, so the cache is bounded in
//! bytes rather than entries.

use crate::codec::ImageCodec;
use crate::error::ImageResult;
use crate::preset::SizePreset;
use moka::future::Cache;
use site_model::EncodedImage;
use std::time::Duration;

/// Default cache budget: 16 MiB of encoded images
pub const DEFAULT_CACHE_BYTES: u64 = 16 * 1024 * 1024;

/// Default time an unused entry stays cached
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(30 * 60);

/// Statistics for cache monitoring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of entries in cache
    pub entry_count: u64,
    /// Total encoded bytes held
    pub weighted_size: u64,
}

/// Cache key: source hash plus preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct IngestKey {
    source: [u8; 32],
    preset: u8,
}

impl IngestKey {
    fn new(bytes: &[u8], preset: SizePreset) -> Self {
        Self {
            source: *blake3::hash(bytes).as_bytes(),
            preset: preset.tag(),
        }
    }
}

/// Byte-bounded cache of encoded uploads
#[derive(Debug, Clone)]
pub struct IngestCache {
    inner: Cache<IngestKey, EncodedImage>,
}

impl IngestCache {
    /// Create cache bounded to `max_bytes` of encoded data
    #[inline]
    #[must_use]
    pub fn new(max_bytes: u64) -> Self {
        Self::with_ttl(max_bytes, DEFAULT_CACHE_TTL)
    }

    /// Create cache with time-based expiration
    #[must_use]
    pub fn with_ttl(max_bytes: u64, ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_bytes)
                .weigher(|_key, value: &EncodedImage| {
                    u32::try_from(value.len()).unwrap_or(u32::MAX)
                })
                .time_to_idle(ttl)
                .build(),
        }
    }

    async fn get(&self, key: &IngestKey) -> Option<EncodedImage> {
        self.inner.get(key).await
    }

    async fn insert(&self, key: IngestKey, encoded: EncodedImage) {
        self.inner.insert(key, encoded).await;
    }

    /// Invalidate all entries
    #[inline]
    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }

    /// Apply pending evictions so statistics are exact
    pub async fn sync(&self) {
        self.inner.run_pending_tasks().await;
    }

    /// Get cache statistics
    #[inline]
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entry_count: self.inner.entry_count(),
            weighted_size: self.inner.weighted_size(),
        }
    }
}

impl Default for IngestCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_BYTES)
    }
}

/// Codec fronted by the ingestion cache
#[derive(Debug, Clone, Default)]
pub struct ImageIngestor {
    codec: ImageCodec,
    cache: IngestCache,
}

impl ImageIngestor {
    /// Create ingestor
    #[inline]
    #[must_use]
    pub fn new(codec: ImageCodec, cache: IngestCache) -> Self {
        Self { codec, cache }
    }

    /// Codec in use
    #[inline]
    #[must_use]
    pub fn codec(&self) -> &ImageCodec {
        &self.codec
    }

    /// Backing cache
    #[inline]
    #[must_use]
    pub fn cache(&self) -> &IngestCache {
        &self.cache
    }

    /// Encode, reusing a cached result for identical input
    ///
    /// Failures are not cached.
    ///
    /// # Errors
    /// As [`ImageCodec::encode`]
    pub async fn ingest(&self, bytes: Vec<u8>, preset: SizePreset) -> ImageResult<EncodedImage> {
        let key = IngestKey::new(&bytes, preset);
        if let Some(cached) = self.cache.get(&key).await {
            tracing::debug!(%preset, bytes = cached.len(), "ingestion cache hit");
            return Ok(cached);
        }

        let encoded = self.codec.encode(bytes, preset).await?;
        self.cache.insert(key, encoded.clone()).await;

        Ok(encoded)
    }

    /// Read a file and ingest it
    ///
    /// # Errors
    /// `Io` if the file cannot be read, otherwise as [`ImageIngestor::ingest`]
    pub async fn ingest_file(
        &self,
        path: impl AsRef<std::path::Path>,
        preset: SizePreset,
    ) -> ImageResult<EncodedImage> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| crate::error::ImageError::io_error(path, e))?;
        self.ingest(bytes, preset).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, ImageFormat, Rgb};
    use std::io::Cursor;

    fn png(width: u32, height: u32, seed: u8) -> Vec<u8> {
        let img: ImageBuffer<Rgb<u8>, Vec<u8>> =
            ImageBuffer::from_fn(width, height, |x, y| Rgb([seed, x as u8, y as u8]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[tokio::test]
    async fn cache_hit_returns_same_value() {
        let ingestor = ImageIngestor::default();
        let input = png(64, 64, 1);

        let first = ingestor.ingest(input.clone(), SizePreset::Photo).await.unwrap();
        let second = ingestor.ingest(input, SizePreset::Photo).await.unwrap();
        assert_eq!(first, second);

        ingestor.cache().sync().await;
        assert_eq!(ingestor.cache().stats().entry_count, 1);
    }

    #[tokio::test]
    async fn presets_are_cached_separately() {
        let ingestor = ImageIngestor::default();
        let input = png(300, 300, 2);

        let photo = ingestor.ingest(input.clone(), SizePreset::Photo).await.unwrap();
        let icon = ingestor.ingest(input, SizePreset::Icon).await.unwrap();
        assert_ne!(photo, icon);

        ingestor.cache().sync().await;
        assert_eq!(ingestor.cache().stats().entry_count, 2);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let ingestor = ImageIngestor::default();
        assert!(ingestor
            .ingest(b"garbage".to_vec(), SizePreset::Photo)
            .await
            .is_err());

        ingestor.cache().sync().await;
        assert_eq!(ingestor.cache().stats().entry_count, 0);
    }

    #[tokio::test]
    async fn cache_stays_within_byte_budget() {
        let budget = 4_096;
        let ingestor = ImageIngestor::new(ImageCodec::new(), IngestCache::new(budget));

        for seed in 0..20u8 {
            ingestor
                .ingest(png(48, 48, seed), SizePreset::Photo)
                .await
                .unwrap();
        }

        ingestor.cache().sync().await;
        assert!(ingestor.cache().stats().weighted_size <= budget);
    }

    #[tokio::test]
    async fn ingest_file_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logo.png");
        std::fs::write(&path, png(40, 20, 3)).unwrap();

        let encoded = ImageIngestor::default()
            .ingest_file(&path, SizePreset::Icon)
            .await
            .unwrap();
        assert_eq!(encoded.media_type(), "image/jpeg");
    }

    #[tokio::test]
    async fn invalidate_all_empties_cache() {
        let ingestor = ImageIngestor::default();
        ingestor.ingest(png(8, 8, 4), SizePreset::Photo).await.unwrap();
        ingestor.cache().invalidate_all();
        ingestor.cache().sync().await;
        assert_eq!(ingestor.cache().stats(), CacheStats::default());
    }
}
