//! Entity identifiers
//!
//! Keys are opaque strings, unique within one collection. Fresh keys are
//! lowercase ULIDs so they are never reused and sort by creation time.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use ulid::Ulid;

/// Longest key the remote store accepts, in bytes
pub const MAX_ID_BYTES: usize = 1500;

/// Document key of an entity within its collection
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityId(String);

impl EntityId {
    /// Generate a fresh, never reused id
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Ulid::new().to_string().to_lowercase())
    }

    /// Parse an id, enforcing the document-key rules
    ///
    /// # Errors
    /// Returns `ValidationError::MalformedId` for empty, oversized, `/`-bearing,
    /// `.` or `..` keys
    pub fn parse(raw: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(ValidationError::malformed_id(raw, "empty"));
        }
        if raw.len() > MAX_ID_BYTES {
            return Err(ValidationError::malformed_id(raw, "longer than 1500 bytes"));
        }
        if raw.contains('/') {
            return Err(ValidationError::malformed_id(raw, "contains '/'"));
        }
        if raw == "." || raw == ".." {
            return Err(ValidationError::malformed_id(raw, "reserved name"));
        }
        Ok(Self(raw))
    }

    /// Wrap a key known to satisfy the document-key rules
    pub(crate) fn from_static(raw: &'static str) -> Self {
        Self(raw.to_string())
    }

    /// Borrow as string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for EntityId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for EntityId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for EntityId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<EntityId> for String {
    fn from(id: EntityId) -> Self {
        id.0
    }
}

impl AsRef<str> for EntityId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
