//! Error types for the quote cache service
//!
//! `ServiceError` is what callers of the cache core and the admin API see.
//! `StoreError` is internal to the cache backends and never escapes
//! `CacheStore`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Service Error Enum ==
/// Unified error type for the service.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// An identified lookup produced no data
    #[error("Ticker '{0}' not found")]
    NotFound(String),

    /// The upstream data provider failed
    #[error("Provider error: {0}")]
    Provider(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Returns true for the typed not-found signal.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ServiceError::NotFound(_))
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Provider(_) => StatusCode::BAD_GATEWAY,
            ServiceError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Store Error Enum ==
/// Failures raised by a cache backend.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Backend is disabled or refusing connections
    #[error("Cache backend unavailable")]
    Unavailable,

    /// Backend did not answer within the configured timeout
    #[error("Cache backend timed out")]
    Timeout,

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// == Result Type Aliases ==
/// Convenience Result type for the service.
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Result type used by cache backends.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
