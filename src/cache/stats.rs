//! Cache Statistics Module
//!
//! Lock-free counters kept by `CacheStore` and the snapshot it reports.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Stats Counters ==
/// Running totals, safe to bump from any thread.
#[derive(Debug, Default)]
pub struct StatsCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
    failures: AtomicU64,
}

impl StatsCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    /// Any backend or serialization failure that was swallowed.
    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Copies the counters into a snapshot.
    pub fn snapshot(&self, available: bool, backend: &str, key_count: usize) -> CacheStats {
        CacheStats {
            available,
            backend: backend.to_string(),
            key_count,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

// == Cache Stats ==
/// Point-in-time view of the cache.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Whether the backend answered a liveness check
    pub available: bool,
    /// Backend name, or "disabled"
    pub backend: String,
    /// Keys currently stored under the global prefix
    pub key_count: usize,
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
    pub failures: u64,
}

impl CacheStats {
    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_starts_at_zero() {
        let stats = StatsCounters::new().snapshot(true, "memory", 0);
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.writes, 0);
        assert_eq!(stats.failures, 0);
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let counters = StatsCounters::new();
        counters.record_hit();
        counters.record_hit();
        counters.record_hit();
        counters.record_miss();

        let stats = counters.snapshot(true, "memory", 1);
        assert_eq!(stats.hit_rate(), 0.75);
    }

    #[test]
    fn test_writes_and_failures() {
        let counters = StatsCounters::new();
        counters.record_write();
        counters.record_failure();
        counters.record_failure();

        let stats = counters.snapshot(false, "redis", 0);
        assert_eq!(stats.writes, 1);
        assert_eq!(stats.failures, 2);
        assert!(!stats.available);
        assert_eq!(stats.backend, "redis");
    }
}
