//! Error types for TideDB core.

use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in TideDB core operations.
///
/// Missing documents are never errors; reads report them as `None`. Only a
/// missing index *name* is.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage engine error.
    #[error("storage error: {0}")]
    Storage(#[from] tidedb_storage::StorageError),

    /// CBOR codec error.
    #[error("codec error: {0}")]
    Codec(#[from] tidedb_codec::CodecError),

    /// Persisted state is not in the expected shape.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the failure.
        message: String,
    },

    /// A unique index already maps the extracted value to another document.
    #[error("unique index {index} on {collection} already holds this value for key {existing_key}")]
    UniqueIndexOverlap {
        /// Collection the index belongs to.
        collection: String,
        /// Name of the index.
        index: String,
        /// Key of the document already posted under the value.
        existing_key: String,
    },

    /// The collection has no index with this name.
    #[error("index {index} not found on {collection}")]
    IndexNotFound {
        /// Collection that was searched.
        collection: String,
        /// Name of the missing index.
        index: String,
    },

    /// Database is closed.
    #[error("database is closed")]
    DatabaseClosed,
}

impl CoreError {
    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Creates an index not found error.
    pub fn index_not_found(collection: impl Into<String>, index: impl Into<String>) -> Self {
        Self::IndexNotFound {
            collection: collection.into(),
            index: index.into(),
        }
    }

    /// Whether this error belongs to the internal family (storage, codec or
    /// corrupted state), as opposed to a rejected request.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::Storage(_) | Self::Codec(_) | Self::Internal { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = CoreError::index_not_found("users", "email");
        assert_eq!(err.to_string(), "index email not found on users");

        let err = CoreError::UniqueIndexOverlap {
            collection: "users".into(),
            index: "email".into(),
            existing_key: "alice".into(),
        };
        assert!(err.to_string().contains("alice"));
    }

    #[test]
    fn internal_family() {
        assert!(CoreError::internal("bad config").is_internal());
        assert!(CoreError::from(tidedb_codec::CodecError::NonFiniteFloat).is_internal());
        assert!(!CoreError::DatabaseClosed.is_internal());
        assert!(!CoreError::index_not_found("t", "b").is_internal());
    }
}
