//! Response DTOs for the admin API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::CacheStats;

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always "healthy"; the service runs with or without its cache
    pub status: String,
    /// "available" or "unavailable"
    pub cache: String,
    /// Cache backend name
    pub backend: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy(cache_available: bool, backend: impl Into<String>) -> Self {
        Self {
            status: "healthy".to_string(),
            cache: if cache_available { "available" } else { "unavailable" }.to_string(),
            backend: backend.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Response body for the cache stats endpoint (GET /cache/stats)
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatsResponse {
    #[serde(flatten)]
    pub stats: CacheStats,
    /// hits / (hits + misses)
    pub hit_rate: f64,
}

impl From<CacheStats> for CacheStatsResponse {
    fn from(stats: CacheStats) -> Self {
        Self {
            hit_rate: stats.hit_rate(),
            stats,
        }
    }
}

/// Response body for namespace clearing (DELETE /cache/:namespace)
#[derive(Debug, Clone, Serialize)]
pub struct ClearNamespaceResponse {
    pub message: String,
    pub namespace: String,
    /// Number of keys removed
    pub removed: usize,
}

impl ClearNamespaceResponse {
    pub fn new(namespace: impl Into<String>, removed: usize) -> Self {
        let namespace = namespace.into();
        Self {
            message: format!("Cleared {} keys from namespace '{}'", removed, namespace),
            namespace,
            removed,
        }
    }
}

/// Plain acknowledgement body
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
