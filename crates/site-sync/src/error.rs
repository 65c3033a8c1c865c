//! Error types for the sync layer
//!
//! Provides:
//! - [`RemoteError`]: what the remote store reports
//! - [`ErrorKind`]: the classification surfaced to presentation code
//! - [`SystemError`]: the single recorded "current blocking condition"
//! - [`SyncError`]: failures returned to callers (validation, ingestion, IO)

use serde::{Deserialize, Serialize};
use site_image::ImageError;
use site_model::{CollectionId, ValidationError};
use std::fmt::{self, Display, Formatter};

/// Failure reported by the remote store
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// Rejected by the access policy
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Network failure or store unreachable
    #[error("remote store unavailable: {0}")]
    Unavailable(String),

    /// Any other store-side failure
    #[error("remote store error: {0}")]
    Internal(String),
}

impl RemoteError {
    /// Classify for the error surface
    #[inline]
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::PermissionDenied(_) => ErrorKind::PermissionDenied,
            Self::Unavailable(_) | Self::Internal(_) => ErrorKind::TransientRemoteFailure,
        }
    }

    /// Check if retrying could succeed without a policy change
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::PermissionDenied(_))
    }
}

/// Error taxonomy visible to presentation code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    /// Uploaded file is not a readable image
    DecodeFailure,
    /// Encoded image exceeds the field budget
    PayloadTooLarge,
    /// Remote access policy rejected the operation
    PermissionDenied,
    /// Network or other remote failure
    TransientRemoteFailure,
    /// Malformed id or missing required field
    ValidationFailure,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::DecodeFailure => "decode-failure",
            ErrorKind::PayloadTooLarge => "payload-too-large",
            ErrorKind::PermissionDenied => "permission-denied",
            ErrorKind::TransientRemoteFailure => "transient-remote-failure",
            ErrorKind::ValidationFailure => "validation-failure",
        };
        f.write_str(name)
    }
}

/// The recorded system error condition (most recent wins)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemError {
    /// Classification
    pub kind: ErrorKind,
    /// Collection the failing operation targeted
    pub collection: CollectionId,
    /// Store-provided detail
    pub message: String,
}

impl SystemError {
    /// Record a remote failure against a collection
    #[must_use]
    pub fn from_remote(collection: CollectionId, error: &RemoteError) -> Self {
        Self {
            kind: error.kind(),
            collection,
            message: error.to_string(),
        }
    }
}

impl Display for SystemError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {}: {}", self.kind, self.collection, self.message)
    }
}

/// Errors returned to callers of the sync layer
///
/// Remote write failures are not here: they are recovered locally and
/// reported through `WriteOutcome::LocalOnly`.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Payload rejected before any write
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Image ingestion failed before any write
    #[error("image ingestion failed: {0}")]
    Image(#[from] ImageError),

    /// Remote failure outside the write path (e.g. explicit seeding)
    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    /// Writes require an authenticated admin session
    #[error("admin login required")]
    NotAuthorized,

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(String),

    /// Local dump IO
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Local dump encoding
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SyncError {
    /// Classify for the error surface, when the error has a taxonomy entry
    #[must_use]
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Validation(ValidationError::ImageTooLarge { .. }) => {
                Some(ErrorKind::PayloadTooLarge)
            }
            Self::Validation(_) => Some(ErrorKind::ValidationFailure),
            Self::Image(ImageError::PayloadTooLarge { .. }) => Some(ErrorKind::PayloadTooLarge),
            Self::Image(ImageError::Decode(_)) => Some(ErrorKind::DecodeFailure),
            Self::Remote(e) => Some(e.kind()),
            _ => None,
        }
    }
}

/// Result type alias for sync operations
pub type SyncResult<T> = Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_error_classification() {
        assert_eq!(
            RemoteError::PermissionDenied("rules".into()).kind(),
            ErrorKind::PermissionDenied
        );
        assert_eq!(
            RemoteError::Unavailable("offline".into()).kind(),
            ErrorKind::TransientRemoteFailure
        );
        assert!(!RemoteError::PermissionDenied("x".into()).is_retryable());
        assert!(RemoteError::Internal("x".into()).is_retryable());
    }

    #[test]
    fn sync_error_kinds() {
        let too_large: SyncError = ImageError::PayloadTooLarge { size: 2, limit: 1 }.into();
        assert_eq!(too_large.kind(), Some(ErrorKind::PayloadTooLarge));

        let decode: SyncError = ImageError::Decode("x".into()).into();
        assert_eq!(decode.kind(), Some(ErrorKind::DecodeFailure));

        let invalid: SyncError = ValidationError::malformed_id("", "empty").into();
        assert_eq!(invalid.kind(), Some(ErrorKind::ValidationFailure));

        assert_eq!(SyncError::NotAuthorized.kind(), None);
    }

    #[test]
    fn system_error_display() {
        let err = SystemError::from_remote(
            CollectionId::MainRoster,
            &RemoteError::PermissionDenied("write rule".into()),
        );
        assert_eq!(
            err.to_string(),
            "permission-denied on mainCommittee: permission denied: write rule"
        );
    }

    #[test]
    fn error_kind_serializes_kebab_case() {
        let json = serde_json::to_string(&ErrorKind::PermissionDenied).unwrap();
        assert_eq!(json, "\"permission-denied\"");
    }
}
