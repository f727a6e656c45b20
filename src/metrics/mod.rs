//! Metrics Module
//!
//! Process-wide usage and latency tracking.

mod tracker;

pub use tracker::{format_uptime, MetricsSummary, MetricsTracker, OperationSnapshot};
