//! Inline image values
//!
//! An [`EncodedImage`] is a `data:image/...;base64,` URL small enough to be
//! stored inside a document field. Producing one from raw bytes is the job of
//! the image codec; this module only guards the shape.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Per-field ceiling of the remote store (1 MiB); no encoded image may exceed it
pub const MAX_ENCODED_BYTES: usize = 1024 * 1024;

const DATA_IMAGE_PREFIX: &str = "data:image/";
const BASE64_MARKER: &str = ";base64,";

/// Size- and dimension-bounded inline image (data URL)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EncodedImage(String);

impl EncodedImage {
    /// Wrap a data URL
    ///
    /// # Errors
    /// Returns `ValidationError::MalformedImage` unless the value is a base64
    /// `data:image/*` URL with a non-empty payload
    pub fn from_data_url(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        if !value.starts_with(DATA_IMAGE_PREFIX) {
            return Err(ValidationError::MalformedImage(
                "expected a data:image/ URL".to_string(),
            ));
        }
        match value.find(BASE64_MARKER) {
            Some(pos) if pos + BASE64_MARKER.len() < value.len() => Ok(Self(value)),
            Some(_) => Err(ValidationError::MalformedImage("empty payload".to_string())),
            None => Err(ValidationError::MalformedImage(
                "expected base64 encoding".to_string(),
            )),
        }
    }

    /// Build from a media type and an already base64-encoded payload
    #[must_use]
    pub fn from_base64(media_type: &str, payload: &str) -> Self {
        Self(format!("data:{media_type}{BASE64_MARKER}{payload}"))
    }

    /// Media type, e.g. `image/jpeg`
    #[must_use]
    pub fn media_type(&self) -> &str {
        let end = self.0.find(BASE64_MARKER).unwrap_or(self.0.len());
        &self.0["data:".len()..end]
    }

    /// Base64 payload without the data URL header
    #[must_use]
    pub fn payload(&self) -> &str {
        self.0
            .find(BASE64_MARKER)
            .map_or("", |pos| &self.0[pos + BASE64_MARKER.len()..])
    }

    /// Full data URL
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Stored size in bytes (what counts against the field ceiling)
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check the stored size against [`MAX_ENCODED_BYTES`]
    ///
    /// # Errors
    /// Returns `ValidationError::ImageTooLarge` naming `field`
    pub fn check_budget(&self, field: &'static str) -> Result<(), ValidationError> {
        if self.len() > MAX_ENCODED_BYTES {
            return Err(ValidationError::ImageTooLarge {
                field,
                size: self.len(),
                limit: MAX_ENCODED_BYTES,
            });
        }
        Ok(())
    }

    /// Always false for a constructed value
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Display for EncodedImage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} bytes)", self.media_type(), self.len())
    }
}

impl TryFrom<String> for EncodedImage {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_data_url(value)
    }
}

impl From<EncodedImage> for String {
    fn from(image: EncodedImage) -> Self {
        image.0
    }
}

/// Gallery image source: external URL or inline encoded image
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ImageRef {
    /// Externally hosted picture
    Url(String),
    /// Uploaded picture stored inline
    Encoded(EncodedImage),
}

impl ImageRef {
    /// Classify a stored string
    #[must_use]
    pub fn parse(value: &str) -> Self {
        if value.starts_with("data:") {
            if let Ok(encoded) = EncodedImage::from_data_url(value) {
                return Self::Encoded(encoded);
            }
        }
        Self::Url(value.to_string())
    }

    /// Stored string form
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Url(url) => url,
            Self::Encoded(image) => image.as_str(),
        }
    }

    /// Whether the picture is stored inline
    #[inline]
    #[must_use]
    pub fn is_encoded(&self) -> bool {
        matches!(self, Self::Encoded(_))
    }
}

impl Default for ImageRef {
    fn default() -> Self {
        Self::Url(String::new())
    }
}

impl From<String> for ImageRef {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<&str> for ImageRef {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl From<ImageRef> for String {
    fn from(value: ImageRef) -> Self {
        match value {
            ImageRef::Url(url) => url,
            ImageRef::Encoded(image) => image.into(),
        }
    }
}

impl From<EncodedImage> for ImageRef {
    fn from(image: EncodedImage) -> Self {
        Self::Encoded(image)
    }
}
