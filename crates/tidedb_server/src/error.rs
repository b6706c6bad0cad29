//! Error types for the request router.

use thiserror::Error;
use tidedb_core::CoreError;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors produced while serving a request.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Malformed request (bad path encoding, bad body, oversized body).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No route matches the path.
    #[error("no route for {0}")]
    RouteNotFound(String),

    /// The route exists but not for this method.
    #[error("method {method} not allowed on {path}")]
    MethodNotAllowed {
        /// Requested method.
        method: String,
        /// Requested path.
        path: String,
    },

    /// Request body is not valid JSON.
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    /// Store error.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Stored value cannot be represented as JSON.
    #[error("codec error: {0}")]
    Codec(#[from] tidedb_codec::CodecError),
}

impl ServerError {
    /// HTTP status code for this error.
    pub fn status(&self) -> u16 {
        match self {
            ServerError::InvalidRequest(_) | ServerError::Json(_) => 400,
            ServerError::RouteNotFound(_) => 404,
            ServerError::MethodNotAllowed { .. } => 405,
            ServerError::Core(CoreError::IndexNotFound { .. }) => 404,
            ServerError::Core(CoreError::UniqueIndexOverlap { .. }) => 409,
            ServerError::Core(_) | ServerError::Codec(_) => 500,
        }
    }

    /// Returns true if this is a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status())
    }
}
