//! In-Process Backend
//!
//! HashMap storage with LRU eviction and TTL expiration, behind the same
//! trait as the Redis backend. Used for single-instance deployments and in
//! tests, where it can be switched off to simulate an outage.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::debug;

use super::{CacheBackend, KeyTtl};
use crate::cache::entry::{current_timestamp_ms, CacheEntry};
use crate::cache::lru::LruTracker;
use crate::error::{StoreError, StoreResult};

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, CacheEntry>,
    lru: LruTracker,
    evictions: u64,
}

impl Inner {
    /// Drops `key` if it has expired; returns true if a live entry remains.
    fn purge_if_expired(&mut self, key: &str, now: u64) -> bool {
        match self.entries.get(key) {
            Some(entry) if entry.is_expired_at(now) => {
                self.entries.remove(key);
                self.lru.remove(key);
                false
            }
            Some(_) => true,
            None => false,
        }
    }
}

// == Memory Backend ==
/// Bounded in-process key-value store.
#[derive(Debug)]
pub struct MemoryBackend {
    inner: Mutex<Inner>,
    max_entries: usize,
    available: AtomicBool,
}

impl MemoryBackend {
    // == Constructor ==
    /// Creates a backend holding at most `max_entries` keys.
    pub fn new(max_entries: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            max_entries: max_entries.max(1),
            available: AtomicBool::new(true),
        }
    }

    /// Simulates an outage (`false`) or recovery (`true`).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.lock().map(|inner| inner.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of entries evicted for capacity since creation.
    pub fn evictions(&self) -> u64 {
        self.lock().map(|inner| inner.evictions).unwrap_or(0)
    }

    // == Cleanup Expired ==
    /// Removes all expired entries, returning how many were dropped.
    pub fn cleanup_expired(&self) -> usize {
        let Ok(mut inner) = self.lock() else {
            return 0;
        };
        let now = current_timestamp_ms();

        let expired: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            inner.entries.remove(key);
            inner.lru.remove(key);
        }

        expired.len()
    }

    fn lock(&self) -> StoreResult<std::sync::MutexGuard<'_, Inner>> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable);
        }
        self.inner.lock().map_err(|_| StoreError::Unavailable)
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new(10_000)
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn ping(&self) -> StoreResult<()> {
        self.lock().map(|_| ())
    }

    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let mut inner = self.lock()?;
        if !inner.purge_if_expired(key, current_timestamp_ms()) {
            return Ok(None);
        }

        inner.lru.touch(key);
        Ok(inner.entries.get(key).map(|entry| entry.value.clone()))
    }

    fn set(
        &self,
        key: &str,
        value: &[u8],
        ttl: Option<u64>,
        only_if_absent: bool,
    ) -> StoreResult<bool> {
        let mut inner = self.lock()?;
        let exists = inner.purge_if_expired(key, current_timestamp_ms());

        if exists && only_if_absent {
            return Ok(false);
        }

        // New key at capacity: make room first
        if !exists && inner.entries.len() >= self.max_entries {
            if let Some(evicted) = inner.lru.evict_oldest() {
                debug!("memory cache evicted {}", evicted);
                inner.entries.remove(&evicted);
                inner.evictions += 1;
            }
        }

        inner
            .entries
            .insert(key.to_string(), CacheEntry::new(value.to_vec(), ttl));
        inner.lru.touch(key);

        Ok(true)
    }

    fn delete(&self, keys: &[String]) -> StoreResult<u64> {
        let mut inner = self.lock()?;
        let now = current_timestamp_ms();
        let mut removed = 0;

        for key in keys {
            if inner.purge_if_expired(key, now) {
                inner.entries.remove(key);
                inner.lru.remove(key);
                removed += 1;
            }
        }

        Ok(removed)
    }

    fn keys(&self, pattern: &str) -> StoreResult<Vec<String>> {
        let inner = self.lock()?;
        let now = current_timestamp_ms();

        Ok(inner
            .entries
            .iter()
            .filter(|(key, entry)| !entry.is_expired_at(now) && glob_match(pattern, key))
            .map(|(key, _)| key.clone())
            .collect())
    }

    fn ttl(&self, key: &str) -> StoreResult<KeyTtl> {
        let mut inner = self.lock()?;
        if !inner.purge_if_expired(key, current_timestamp_ms()) {
            return Ok(KeyTtl::Missing);
        }

        Ok(inner
            .entries
            .get(key)
            .and_then(CacheEntry::ttl_remaining)
            .map_or(KeyTtl::Persistent, KeyTtl::Expires))
    }
}

/// Glob matching with `*` as the only wildcard.
fn glob_match(pattern: &str, text: &str) -> bool {
    let mut parts = pattern.split('*');
    let first = parts.next().unwrap_or("");

    let Some(mut rest) = text.strip_prefix(first) else {
        return false;
    };

    let tail: Vec<&str> = parts.collect();
    let Some((last, middle)) = tail.split_last() else {
        // No wildcard at all
        return rest.is_empty();
    };

    for part in middle {
        match rest.find(part) {
            Some(pos) => rest = &rest[pos + part.len()..],
            None => return false,
        }
    }

    rest.len() >= last.len() && rest.ends_with(last)
}
