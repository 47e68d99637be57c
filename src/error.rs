//! Error types for the expiring cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Store Error Enum ==
/// Failures reported by a backing [`Store`](crate::storage::Store).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The write does not fit in the remaining capacity
    #[error("Quota exceeded: {needed} bytes needed, {available} bytes available")]
    QuotaExceeded { needed: usize, available: usize },

    /// Persisting the store failed
    #[error("Store I/O failure: {0}")]
    Io(String),

    /// The store cannot be reached (e.g. poisoned lock)
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

// == Cache Error Enum ==
/// Unified error type for the cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key not found in cache (or expired)
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A TTL of zero would create an entry that is already stale
    #[error("Invalid TTL: must be greater than zero")]
    InvalidTtl,

    /// Serialized entry is larger than the per-entry ceiling
    #[error("Entry too large: {size} bytes exceeds limit of {limit} bytes")]
    Oversized { size: usize, limit: usize },

    /// Store stayed full after eviction
    #[error("Cache full: could not reclaim {needed} bytes")]
    QuotaExceeded { needed: usize },

    /// Value could not be encoded
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Any other store failure
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Settings that cannot be served (e.g. overlapping namespace prefixes)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A blocking cache task failed to complete
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) | CacheError::InvalidTtl => StatusCode::BAD_REQUEST,
            CacheError::Serialization(_) => StatusCode::BAD_REQUEST,
            CacheError::Oversized { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            CacheError::QuotaExceeded { .. } => StatusCode::INSUFFICIENT_STORAGE,
            CacheError::Store(_) | CacheError::InvalidConfig(_) | CacheError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
