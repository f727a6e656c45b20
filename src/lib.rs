//! Quote Cache - cache-aside and output normalization for a market data API
//!
//! Caches the results of data-provider calls in Redis (or in process),
//! normalizes provider output into JSON-safe values, and tracks per-operation
//! usage metrics. The cache is strictly optional: when the store is
//! unreachable every operation runs uncached.

pub mod api;
pub mod cache;
pub mod config;
pub mod data;
pub mod error;
pub mod metrics;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheAside, CacheStore, CachedOperation, CallArgs};
pub use config::Config;
pub use error::{Result, ServiceError};
pub use metrics::MetricsTracker;
pub use tasks::{spawn_cleanup_task, stop_cleanup_task};
