//! Codec errors.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Why a value could not be encoded or a byte string decoded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// NaN and infinite floats have no JSON form and no canonical encoding.
    #[error("non-finite float values are forbidden")]
    NonFiniteFloat,

    /// Two map entries share a key.
    #[error("map contains a duplicate key")]
    DuplicateKey,

    /// JSON objects only have text keys.
    #[error("map key is not text")]
    NonTextKey,

    /// Input ended in the middle of an item.
    #[error("unexpected end of input")]
    UnexpectedEnd,

    /// Bytes left over after the top-level item.
    #[error("{count} trailing bytes after value")]
    TrailingBytes {
        /// Number of unread bytes.
        count: usize,
    },

    /// Well-formed CBOR that a canonical encoder would never produce.
    #[error("non-canonical encoding: {reason}")]
    NonCanonical {
        /// What was out of form.
        reason: &'static str,
    },

    /// A CBOR construct with no `Value` counterpart.
    #[error("unsupported CBOR item: {what}")]
    Unsupported {
        /// Description of the item.
        what: String,
    },

    /// Text string is not UTF-8.
    #[error("invalid UTF-8 in text string")]
    InvalidUtf8,

    /// Integer outside the `i64` range.
    #[error("integer out of range")]
    IntegerOverflow,

    /// A length prefix claims more than is allowed.
    #[error("length {claimed} exceeds limit {limit}")]
    TooLarge {
        /// Length claimed by the input.
        claimed: u64,
        /// Maximum accepted length.
        limit: u64,
    },

    /// Arrays and maps nest deeper than allowed.
    #[error("nesting deeper than {limit}")]
    TooDeep {
        /// Maximum accepted depth.
        limit: usize,
    },
}

impl CodecError {
    pub(crate) fn non_canonical(reason: &'static str) -> Self {
        Self::NonCanonical { reason }
    }

    pub(crate) fn unsupported(what: impl Into<String>) -> Self {
        Self::Unsupported { what: what.into() }
    }
}
