//! Metrics Tracker
//!
//! Per-operation call counts, error counts and latency aggregates. One
//! tracker is created at startup and shared by `Arc`; every update takes
//! the same lock, so concurrent callers never lose increments.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Entries reported in each top-N list of the summary.
const TOP_N: usize = 5;

// == Operation Metrics ==
#[derive(Debug, Clone)]
struct OperationMetrics {
    call_count: u64,
    error_count: u64,
    total_latency: f64,
    min_latency: f64,
    max_latency: f64,
    last_called_at: Option<DateTime<Utc>>,
}

impl Default for OperationMetrics {
    fn default() -> Self {
        Self {
            call_count: 0,
            error_count: 0,
            total_latency: 0.0,
            min_latency: f64::INFINITY,
            max_latency: 0.0,
            last_called_at: None,
        }
    }
}

impl OperationMetrics {
    fn avg_latency(&self) -> f64 {
        if self.call_count == 0 {
            0.0
        } else {
            self.total_latency / self.call_count as f64
        }
    }

    fn snapshot(&self, name: &str) -> OperationSnapshot {
        OperationSnapshot {
            name: name.to_string(),
            call_count: self.call_count,
            error_count: self.error_count,
            error_rate: percentage(self.error_count, self.call_count),
            avg_latency: self.avg_latency(),
            min_latency: if self.min_latency.is_finite() { self.min_latency } else { 0.0 },
            max_latency: self.max_latency,
            last_called_at: self.last_called_at,
        }
    }
}

#[derive(Debug)]
struct TrackerState {
    start_time: DateTime<Utc>,
    total_requests: u64,
    operations: HashMap<String, OperationMetrics>,
}

impl TrackerState {
    fn new() -> Self {
        Self {
            start_time: Utc::now(),
            total_requests: 0,
            operations: HashMap::new(),
        }
    }
}

// == Snapshots ==
/// Point-in-time figures for one operation. Latencies are in seconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationSnapshot {
    pub name: String,
    pub call_count: u64,
    pub error_count: u64,
    /// Percentage, 0-100
    pub error_rate: f64,
    pub avg_latency: f64,
    pub min_latency: f64,
    pub max_latency: f64,
    pub last_called_at: Option<DateTime<Utc>>,
}

/// Aggregate view returned by `MetricsTracker::get_summary`.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSummary {
    pub start_time: DateTime<Utc>,
    pub uptime: String,
    pub total_requests: u64,
    pub total_operations: usize,
    pub total_calls: u64,
    pub total_errors: u64,
    /// Percentage, 0-100
    pub error_rate: f64,
    pub top_operations: Vec<OperationSnapshot>,
    pub slowest_operations: Vec<OperationSnapshot>,
}

// == Metrics Tracker ==
#[derive(Debug)]
pub struct MetricsTracker {
    state: Mutex<TrackerState>,
    enabled: bool,
}

impl MetricsTracker {
    pub fn new(enabled: bool) -> Self {
        Self {
            state: Mutex::new(TrackerState::new()),
            enabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn lock(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // == Recording ==
    /// Records one invocation of `name` that took `latency_secs`.
    pub fn record_call(&self, name: &str, latency_secs: f64, is_error: bool) {
        if !self.enabled {
            return;
        }

        let mut state = self.lock();
        let metrics = state.operations.entry(name.to_string()).or_default();

        metrics.call_count += 1;
        metrics.total_latency += latency_secs;
        metrics.min_latency = metrics.min_latency.min(latency_secs);
        metrics.max_latency = metrics.max_latency.max(latency_secs);
        metrics.last_called_at = Some(Utc::now());

        if is_error {
            metrics.error_count += 1;
        }
    }

    /// Counts one inbound request.
    pub fn record_request(&self) {
        if self.enabled {
            self.lock().total_requests += 1;
        }
    }

    /// Runs `f`, recording its latency and outcome under `name`.
    pub fn track<T, E>(&self, name: &str, f: impl FnOnce() -> Result<T, E>) -> Result<T, E> {
        let started = Instant::now();
        let result = f();
        self.record_call(name, started.elapsed().as_secs_f64(), result.is_err());
        result
    }

    /// Awaits `fut`, recording its latency and outcome under `name`.
    pub async fn track_async<T, E>(
        &self,
        name: &str,
        fut: impl Future<Output = Result<T, E>>,
    ) -> Result<T, E> {
        let started = Instant::now();
        let result = fut.await;
        self.record_call(name, started.elapsed().as_secs_f64(), result.is_err());
        result
    }

    // == Reporting ==
    /// Figures for a single operation, if it has ever been recorded.
    pub fn operation(&self, name: &str) -> Option<OperationSnapshot> {
        self.lock()
            .operations
            .get(name)
            .map(|metrics| metrics.snapshot(name))
    }

    pub fn operations(&self) -> Vec<OperationSnapshot> {
        let state = self.lock();
        let mut all: Vec<OperationSnapshot> = state
            .operations
            .iter()
            .map(|(name, metrics)| metrics.snapshot(name))
            .collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    pub fn get_summary(&self) -> MetricsSummary {
        let state = self.lock();

        let snapshots: Vec<OperationSnapshot> = state
            .operations
            .iter()
            .map(|(name, metrics)| metrics.snapshot(name))
            .collect();

        let total_calls = snapshots.iter().map(|s| s.call_count).sum();
        let total_errors = snapshots.iter().map(|s| s.error_count).sum();

        let mut top_operations = snapshots.clone();
        top_operations.sort_by(|a, b| b.call_count.cmp(&a.call_count).then_with(|| a.name.cmp(&b.name)));
        top_operations.truncate(TOP_N);

        let mut slowest_operations: Vec<OperationSnapshot> =
            snapshots.into_iter().filter(|s| s.call_count > 0).collect();
        slowest_operations.sort_by(|a, b| b.avg_latency.total_cmp(&a.avg_latency));
        slowest_operations.truncate(TOP_N);

        let now = Utc::now();
        MetricsSummary {
            start_time: state.start_time,
            uptime: format_uptime((now - state.start_time).num_seconds()),
            total_requests: state.total_requests,
            total_operations: state.operations.len(),
            total_calls,
            total_errors,
            error_rate: percentage(total_errors, total_calls),
            top_operations,
            slowest_operations,
        }
    }

    /// Drops every counter and restarts the uptime clock.
    pub fn reset(&self) {
        *self.lock() = TrackerState::new();
    }
}

impl Default for MetricsTracker {
    fn default() -> Self {
        Self::new(true)
    }
}

fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// Renders seconds as `"{d}d {h}h {m}m {s}s"`.
pub fn format_uptime(total_secs: i64) -> String {
    let secs = total_secs.max(0);
    let (days, rem) = (secs / 86_400, secs % 86_400);
    let (hours, rem) = (rem / 3_600, rem % 3_600);
    let (minutes, seconds) = (rem / 60, rem % 60);
    format!("{}d {}h {}m {}s", days, hours, minutes, seconds)
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_record_call_aggregates() {
        let tracker = MetricsTracker::new(true);
        tracker.record_call("history", 0.2, false);
        tracker.record_call("history", 0.4, true);

        let op = tracker.operation("history").unwrap();
        assert_eq!(op.call_count, 2);
        assert_eq!(op.error_count, 1);
        assert!((op.avg_latency - 0.3).abs() < 1e-9);
        assert_eq!(op.min_latency, 0.2);
        assert_eq!(op.max_latency, 0.4);
        assert_eq!(op.error_rate, 50.0);
        assert!(op.last_called_at.is_some());
    }

    #[test]
    fn test_unknown_operation() {
        let tracker = MetricsTracker::new(true);
        assert!(tracker.operation("nope").is_none());
    }

    #[test]
    fn test_zero_call_guards() {
        let metrics = OperationMetrics::default();
        let snap = metrics.snapshot("idle");
        assert_eq!(snap.avg_latency, 0.0);
        assert_eq!(snap.min_latency, 0.0);
        assert_eq!(snap.error_rate, 0.0);

        let summary = MetricsTracker::new(true).get_summary();
        assert_eq!(summary.total_calls, 0);
        assert_eq!(summary.error_rate, 0.0);
        assert!(summary.top_operations.is_empty());
    }

    #[test]
    fn test_concurrent_updates_are_not_lost() {
        let tracker = Arc::new(MetricsTracker::new(true));

        let handles: Vec<_> = (0..100)
            .map(|i| {
                let tracker = Arc::clone(&tracker);
                thread::spawn(move || tracker.record_call("quote", 0.001, i % 10 == 0))
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let op = tracker.operation("quote").unwrap();
        assert_eq!(op.call_count, 100);
        assert_eq!(op.error_count, 10);
    }

    #[test]
    fn test_summary_rankings() {
        let tracker = MetricsTracker::new(true);
        for i in 0..7 {
            let name = format!("op{}", i);
            for _ in 0..=i {
                tracker.record_call(&name, 0.01 * (7 - i) as f64, false);
            }
        }
        tracker.record_request();
        tracker.record_request();

        let summary = tracker.get_summary();
        assert_eq!(summary.total_requests, 2);
        assert_eq!(summary.total_operations, 7);
        assert_eq!(summary.top_operations.len(), 5);
        assert_eq!(summary.top_operations[0].name, "op6");
        assert_eq!(summary.slowest_operations.len(), 5);
        assert_eq!(summary.slowest_operations[0].name, "op0");
    }

    #[test]
    fn test_reset_clears_state() {
        let tracker = MetricsTracker::new(true);
        tracker.record_call("a", 0.1, true);
        tracker.record_request();

        tracker.reset();

        let summary = tracker.get_summary();
        assert_eq!(summary.total_requests, 0);
        assert_eq!(summary.total_calls, 0);
        assert!(tracker.operation("a").is_none());
    }

    #[test]
    fn test_disabled_tracker_records_nothing() {
        let tracker = MetricsTracker::new(false);
        tracker.record_call("a", 0.1, false);
        tracker.record_request();

        assert!(tracker.operation("a").is_none());
        assert_eq!(tracker.get_summary().total_requests, 0);
    }

    #[test]
    fn test_track_helpers() {
        let tracker = MetricsTracker::new(true);

        let ok: Result<i32, &str> = tracker.track("sync", || Ok(1));
        let err: Result<i32, &str> = tracker.track("sync", || Err("boom"));

        assert_eq!(ok, Ok(1));
        assert_eq!(err, Err("boom"));
        assert_eq!(tracker.operation("sync").unwrap().error_count, 1);
    }

    #[tokio::test]
    async fn test_track_async() {
        let tracker = MetricsTracker::new(true);
        let result: Result<&str, ()> = tracker.track_async("async", async { Ok("done") }).await;

        assert_eq!(result, Ok("done"));
        assert_eq!(tracker.operation("async").unwrap().call_count, 1);
    }

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(0), "0d 0h 0m 0s");
        assert_eq!(format_uptime(90_061), "1d 1h 1m 1s");
        assert_eq!(format_uptime(-5), "0d 0h 0m 0s");
    }
}
