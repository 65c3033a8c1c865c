//! Validation errors raised while building or sanitizing entities

/// Errors for payloads that cannot be written to the remote store
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Identifier violates the document-key rules
    #[error("malformed id '{id}': {reason}")]
    MalformedId {
        /// Offending identifier
        id: String,
        /// Which rule it broke
        reason: &'static str,
    },

    /// A required field is empty
    #[error("missing required field '{field}' on {entity}")]
    MissingField {
        /// Entity kind
        entity: &'static str,
        /// Field name
        field: &'static str,
    },

    /// Value is not an encoded-image data URL
    #[error("malformed encoded image: {0}")]
    MalformedImage(String),

    /// Inline image is over the per-field budget
    #[error("image in '{field}' is {size} bytes, over the {limit} byte budget")]
    ImageTooLarge {
        /// Field holding the image
        field: &'static str,
        /// Stored size in bytes
        size: usize,
        /// Budget in bytes
        limit: usize,
    },

    /// Field update targets an id that is not in the collection
    #[error("no {entity} with id '{id}'")]
    UnknownEntity {
        /// Entity kind
        entity: &'static str,
        /// Requested identifier
        id: String,
    },
}

impl ValidationError {
    /// Create malformed id error
    pub fn malformed_id(id: impl Into<String>, reason: &'static str) -> Self {
        Self::MalformedId {
            id: id.into(),
            reason,
        }
    }

    /// Create unknown entity error
    pub fn unknown_entity(entity: &'static str, id: impl Into<String>) -> Self {
        Self::UnknownEntity {
            entity,
            id: id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_id_display() {
        let err = ValidationError::malformed_id("a/b", "contains '/'");
        assert_eq!(err.to_string(), "malformed id 'a/b': contains '/'");
    }

    #[test]
    fn unknown_entity_display() {
        let err = ValidationError::unknown_entity("roster member", "mc9");
        assert_eq!(err.to_string(), "no roster member with id 'mc9'");
    }
}
