//! Error types for the group cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for group operations and the peer RPC surface.
///
/// `Clone` so that a single failed load can be handed to every caller that
/// joined the same in-flight request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Request carried an empty key
    #[error("key required")]
    KeyRequired,

    /// No group registered under this name
    #[error("group not found: {0}")]
    GroupNotFound(String),

    /// Every layer (local cache, peer, loader) missed
    #[error("data not found: {0}")]
    NotFound(String),

    /// Remote peer failed or was unreachable
    #[error("peer error: {0}")]
    Peer(String),

    /// Internal server error
    #[error("internal error: {0}")]
    Internal(String),
}

impl CacheError {
    /// Returns true for the "data not found" condition.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CacheError::NotFound(_))
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::KeyRequired => StatusCode::BAD_REQUEST,
            CacheError::GroupNotFound(_) => StatusCode::NOT_FOUND,
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::Peer(_) => StatusCode::BAD_GATEWAY,
            CacheError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the group cache.
pub type Result<T> = std::result::Result<T, CacheError>;
