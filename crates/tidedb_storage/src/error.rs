//! Error types for storage operations.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The key-value engine reported a failure.
    #[error("engine error: {0}")]
    Engine(#[from] redb::Error),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

macro_rules! engine_error_from {
    ($($source:ty),* $(,)?) => {
        $(
            impl From<$source> for StorageError {
                fn from(err: $source) -> Self {
                    Self::Engine(err.into())
                }
            }
        )*
    };
}

engine_error_from!(
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_converts() {
        let err: StorageError = io::Error::new(io::ErrorKind::Other, "disk gone").into();
        assert!(matches!(err, StorageError::Io(_)));
        assert!(err.to_string().contains("disk gone"));
    }

    #[test]
    fn engine_errors_convert() {
        let err: StorageError = redb::TableError::TableDoesNotExist("users".into()).into();
        assert!(matches!(err, StorageError::Engine(_)));
    }
}
