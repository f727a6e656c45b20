//! API Module
//!
//! HTTP handlers and routing for the admin REST API.
//!
//! # Endpoints
//! - `GET /health` - Health check with cache availability
//! - `GET /cache/stats` - Cache statistics
//! - `DELETE /cache/:namespace` - Clear one cache namespace
//! - `GET /metrics` - Metrics summary
//! - `GET /metrics/:name` - Metrics for one operation
//! - `POST /metrics/reset` - Reset metrics

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
