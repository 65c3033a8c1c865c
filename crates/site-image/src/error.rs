//! Ingestion errors

use std::path::PathBuf;

/// Errors that abort an image ingestion before any write
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    /// Source is not a readable image
    #[error("could not decode image: {0}")]
    Decode(String),

    /// Encoded result exceeds the per-field budget
    #[error("encoded image is {size} bytes, limit is {limit}")]
    PayloadTooLarge {
        /// Encoded size in bytes
        size: usize,
        /// Budget in bytes
        limit: usize,
    },

    /// Source file could not be read
    #[error("io error reading {path}: {source}")]
    Io {
        /// File that failed
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Re-encoding failed or the worker was lost
    #[error("could not encode image: {0}")]
    Encode(String),
}

impl ImageError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Check if the source itself was unusable
    #[inline]
    #[must_use]
    pub fn is_decode_failure(&self) -> bool {
        matches!(self, Self::Decode(_))
    }

    /// Check if the result was over budget
    #[inline]
    #[must_use]
    pub fn is_too_large(&self) -> bool {
        matches!(self, Self::PayloadTooLarge { .. })
    }
}

/// Result type alias for ingestion
pub type ImageResult<T> = Result<T, ImageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn too_large_display() {
        let err = ImageError::PayloadTooLarge {
            size: 2_000_000,
            limit: 1_048_576,
        };
        assert_eq!(
            err.to_string(),
            "encoded image is 2000000 bytes, limit is 1048576"
        );
        assert!(err.is_too_large());
        assert!(!err.is_decode_failure());
    }

    #[test]
    fn decode_is_distinct() {
        let err = ImageError::Decode("bad header".into());
        assert!(err.is_decode_failure());
        assert!(!err.is_too_large());
    }
}
