//! Site configuration
//!
//! Loaded from TOML. Every section is optional; missing values take the
//! defaults below.

use crate::coordinator::DEFAULT_OUTBOX_CAPACITY;
use crate::error::{SyncError, SyncResult};
use serde::{Deserialize, Serialize};
use site_image::cache::{DEFAULT_CACHE_BYTES, DEFAULT_CACHE_TTL};
use site_image::preset::{ICON_MAX_DIMENSION, PHOTO_MAX_DIMENSION};
use site_image::{
    ImageCodec, ImageIngestor, IngestCache, SizePreset, DEFAULT_JPEG_QUALITY, MAX_ENCODED_BYTES,
};
use std::path::Path;
use std::time::Duration;

/// Image ingestion settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// Largest side of photos, logos and gallery pictures
    pub photo_max_dimension: u32,
    /// Largest side of favicons
    pub icon_max_dimension: u32,
    /// JPEG quality, 1 to 100
    pub jpeg_quality: u8,
    /// Encoded-size budget per image; values above the store ceiling are
    /// clamped to it
    pub max_encoded_bytes: usize,
    /// Ingestion cache budget in bytes
    pub cache_bytes: u64,
    /// Seconds an unused cache entry is kept
    pub cache_ttl_secs: u64,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            photo_max_dimension: PHOTO_MAX_DIMENSION,
            icon_max_dimension: ICON_MAX_DIMENSION,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            max_encoded_bytes: MAX_ENCODED_BYTES,
            cache_bytes: DEFAULT_CACHE_BYTES,
            cache_ttl_secs: DEFAULT_CACHE_TTL.as_secs(),
        }
    }
}

impl ImageConfig {
    /// Codec for these settings
    #[must_use]
    pub fn codec(&self) -> ImageCodec {
        ImageCodec::new()
            .with_quality(self.jpeg_quality)
            .with_max_encoded_bytes(self.max_encoded_bytes)
            .with_max_dimension(SizePreset::Photo, self.photo_max_dimension)
            .with_max_dimension(SizePreset::Icon, self.icon_max_dimension)
    }

    /// Cached ingestor for these settings
    #[must_use]
    pub fn ingestor(&self) -> ImageIngestor {
        let cache = IngestCache::with_ttl(self.cache_bytes, Duration::from_secs(self.cache_ttl_secs));
        ImageIngestor::new(self.codec(), cache)
    }
}

/// Admin login credential
///
/// A convenience gate for the edit surface, not a security boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Login name
    pub username: String,
    /// Login password
    pub password: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            password: "change-me".to_string(),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Image ingestion
    pub images: ImageConfig,
    /// Admin credential
    pub admin: AdminConfig,
    /// Unsent contact messages kept locally
    pub outbox_capacity: usize,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            images: ImageConfig::default(),
            admin: AdminConfig::default(),
            outbox_capacity: DEFAULT_OUTBOX_CAPACITY,
        }
    }
}

impl SiteConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With admin credential
    #[must_use]
    pub fn with_admin(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.admin = AdminConfig {
            username: username.into(),
            password: password.into(),
        };
        self
    }

    /// With image settings
    #[must_use]
    pub fn with_images(mut self, mut images: ImageConfig) -> Self {
        images.max_encoded_bytes = images.max_encoded_bytes.min(MAX_ENCODED_BYTES);
        self.images = images;
        self
    }

    /// With outbox capacity
    #[must_use]
    pub fn with_outbox_capacity(mut self, capacity: usize) -> Self {
        self.outbox_capacity = capacity;
        self
    }

    /// Parse TOML
    ///
    /// # Errors
    /// `Config` if the text is not valid TOML for this shape
    pub fn from_toml_str(text: &str) -> SyncResult<Self> {
        let mut config: Self =
            toml::from_str(text).map_err(|e| SyncError::Config(e.to_string()))?;
        config.images.max_encoded_bytes = config.images.max_encoded_bytes.min(MAX_ENCODED_BYTES);
        Ok(config)
    }

    /// Render as TOML
    ///
    /// # Errors
    /// `Config` if serialization fails
    pub fn to_toml_string(&self) -> SyncResult<String> {
        toml::to_string_pretty(self).map_err(|e| SyncError::Config(e.to_string()))
    }

    /// Load from a TOML file
    ///
    /// # Errors
    /// `Io` if the file cannot be read, `Config` if it does not parse
    pub async fn load(path: impl AsRef<Path>) -> SyncResult<Self> {
        let text = tokio::fs::read_to_string(path.as_ref()).await?;
        Self::from_toml_str(&text)
    }
}
