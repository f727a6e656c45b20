//! Cache Store Module
//!
//! Typed façade over a `CacheBackend`. Values are stored as JSON bytes.
//! Every backend or serialization failure is logged and swallowed here:
//! callers only ever see `false`, `None` or `0`, and treat all of them as
//! "compute it yourself".

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::backend::{CacheBackend, KeyTtl};
use crate::cache::key::{generate_key, namespace_pattern, CallArgs};
use crate::cache::stats::{CacheStats, StatsCounters};
use crate::error::{StoreError, StoreResult};

// == Cache Store ==
/// Shared cache handle. Build one at startup and pass it by `Arc`.
pub struct CacheStore {
    backend: Option<Arc<dyn CacheBackend>>,
    prefix: String,
    stats: StatsCounters,
}

impl CacheStore {
    // == Constructors ==
    /// Creates a store over `backend`, namespacing keys under `prefix`.
    pub fn new(backend: Arc<dyn CacheBackend>, prefix: impl Into<String>) -> Self {
        Self {
            backend: Some(backend),
            prefix: prefix.into(),
            stats: StatsCounters::new(),
        }
    }

    /// Creates a store that is never available.
    pub fn disabled(prefix: impl Into<String>) -> Self {
        Self {
            backend: None,
            prefix: prefix.into(),
            stats: StatsCounters::new(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.as_ref().map_or("disabled", |b| b.name())
    }

    /// Key for a call under `namespace`.
    pub fn generate_key(&self, namespace: &str, args: &CallArgs) -> String {
        generate_key(&self.prefix, namespace, args)
    }

    // == Setup ==
    /// Checks the backend once and logs the outcome.
    pub async fn connect(&self) -> bool {
        let Some(backend) = &self.backend else {
            info!("Caching disabled by configuration");
            return false;
        };

        match backend.ping_async().await {
            Ok(()) => {
                info!("Successfully connected to {} cache backend", backend.name());
                true
            }
            Err(e) => {
                warn!("Could not connect to {} cache backend: {}. Caching will be disabled.", backend.name(), e);
                false
            }
        }
    }

    // == Availability ==
    /// Liveness check; false on any error.
    pub fn is_available(&self) -> bool {
        match &self.backend {
            Some(backend) => self.check(backend.ping(), "ping").is_some(),
            None => false,
        }
    }

    pub async fn is_available_async(&self) -> bool {
        match &self.backend {
            Some(backend) => self.check(backend.ping_async().await, "ping").is_some(),
            None => false,
        }
    }

    // == Set ==
    /// Serializes and stores `value`. Returns false if nothing was written.
    ///
    /// A TTL of zero means the entry is already stale, so any existing entry
    /// is removed instead. With `only_if_absent` an existing entry is never
    /// touched, so a zero TTL writes nothing.
    pub fn set<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<u64>,
        only_if_absent: bool,
    ) -> bool {
        let Some(backend) = &self.backend else {
            return false;
        };

        if ttl == Some(0) {
            if only_if_absent {
                return false;
            }
            debug!("ttl for {} already elapsed, dropping entry", key);
            return self.delete(key);
        }

        let Some(bytes) = self.encode(key, value) else {
            return false;
        };

        let written = self
            .check(backend.set(key, &bytes, ttl, only_if_absent), key)
            .unwrap_or(false);
        if written {
            self.stats.record_write();
        }
        written
    }

    pub async fn set_async<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<u64>,
        only_if_absent: bool,
    ) -> bool {
        let Some(backend) = &self.backend else {
            return false;
        };

        if ttl == Some(0) {
            if only_if_absent {
                return false;
            }
            debug!("ttl for {} already elapsed, dropping entry", key);
            return self.delete_async(key).await;
        }

        let Some(bytes) = self.encode(key, value) else {
            return false;
        };

        let written = self
            .check(backend.set_async(key, &bytes, ttl, only_if_absent).await, key)
            .unwrap_or(false);
        if written {
            self.stats.record_write();
        }
        written
    }

    // == Get ==
    /// Returns the stored value, or None on miss, outage or a bad payload.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let backend = self.backend.as_ref()?;
        let bytes = self.check(backend.get(key), key).flatten();
        self.decode(key, bytes)
    }

    pub async fn get_async<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let backend = self.backend.as_ref()?;
        let bytes = self.check(backend.get_async(key).await, key).flatten();
        self.decode(key, bytes)
    }

    // == Delete ==
    /// Removes `key`; true if it existed.
    pub fn delete(&self, key: &str) -> bool {
        let Some(backend) = &self.backend else {
            return false;
        };
        let keys = [key.to_string()];
        self.check(backend.delete(&keys), key).unwrap_or(0) > 0
    }

    pub async fn delete_async(&self, key: &str) -> bool {
        let Some(backend) = &self.backend else {
            return false;
        };
        let keys = [key.to_string()];
        self.check(backend.delete_async(&keys).await, key).unwrap_or(0) > 0
    }

    // == Clear Namespace ==
    /// Removes every key under `namespace` in one batch; returns the count.
    pub fn clear_namespace(&self, namespace: &str) -> usize {
        let Some(backend) = &self.backend else {
            return 0;
        };

        let pattern = namespace_pattern(&self.prefix, namespace);
        let Some(keys) = self.check(backend.keys(&pattern), &pattern) else {
            return 0;
        };
        if keys.is_empty() {
            return 0;
        }

        let removed = self.check(backend.delete(&keys), &pattern).unwrap_or(0) as usize;
        info!("Cleared {} keys from cache namespace '{}'", removed, namespace);
        removed
    }

    pub async fn clear_namespace_async(&self, namespace: &str) -> usize {
        let Some(backend) = &self.backend else {
            return 0;
        };

        let pattern = namespace_pattern(&self.prefix, namespace);
        let Some(keys) = self.check(backend.keys_async(&pattern).await, &pattern) else {
            return 0;
        };
        if keys.is_empty() {
            return 0;
        }

        let removed = self
            .check(backend.delete_async(&keys).await, &pattern)
            .unwrap_or(0) as usize;
        info!("Cleared {} keys from cache namespace '{}'", removed, namespace);
        removed
    }

    // == TTL ==
    /// Remaining lifetime of `key`; Missing when unknown or unavailable.
    pub fn ttl(&self, key: &str) -> KeyTtl {
        self.backend
            .as_ref()
            .and_then(|backend| self.check(backend.ttl(key), key))
            .unwrap_or(KeyTtl::Missing)
    }

    pub async fn ttl_async(&self, key: &str) -> KeyTtl {
        let Some(backend) = &self.backend else {
            return KeyTtl::Missing;
        };
        self.check(backend.ttl_async(key).await, key)
            .unwrap_or(KeyTtl::Missing)
    }

    // == Stats ==
    /// Snapshot of availability, key count and hit/miss counters.
    pub async fn stats(&self) -> CacheStats {
        let backend_name = self.backend_name();
        let Some(backend) = &self.backend else {
            return self.stats.snapshot(false, backend_name, 0);
        };

        if self.check(backend.ping_async().await, "ping").is_none() {
            return self.stats.snapshot(false, backend_name, 0);
        }

        let pattern = format!("{}:*", self.prefix);
        let key_count = self
            .check(backend.keys_async(&pattern).await, &pattern)
            .map_or(0, |keys| keys.len());

        self.stats.snapshot(true, backend_name, key_count)
    }

    // == Helpers ==
    /// Logs and counts a failure; the caller gets None.
    fn check<T>(&self, result: StoreResult<T>, context: &str) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(StoreError::Unavailable) => {
                debug!("cache backend unavailable ({})", context);
                self.stats.record_failure();
                None
            }
            Err(e) => {
                warn!("Cache operation failed for {}: {}", context, e);
                self.stats.record_failure();
                None
            }
        }
    }

    fn encode<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Option<Vec<u8>> {
        self.check(serde_json::to_vec(value).map_err(StoreError::from), key)
    }

    fn decode<T: DeserializeOwned>(&self, key: &str, bytes: Option<Vec<u8>>) -> Option<T> {
        let Some(bytes) = bytes else {
            self.stats.record_miss();
            return None;
        };

        match self.check(serde_json::from_slice(&bytes).map_err(StoreError::from), key) {
            Some(value) => {
                self.stats.record_hit();
                Some(value)
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("backend", &self.backend_name())
            .field("prefix", &self.prefix)
            .finish()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::backend::MemoryBackend;
    use serde_json::{json, Value};

    fn store() -> (Arc<MemoryBackend>, CacheStore) {
        let backend = Arc::new(MemoryBackend::new(100));
        let store = CacheStore::new(backend.clone(), "test");
        (backend, store)
    }

    #[test]
    fn test_set_and_get_round_trip() {
        let (_, store) = store();
        let value = json!({"price": 189.5, "volume": 1000, "tags": ["a", "b"], "none": null});

        assert!(store.set("test:ns:1", &value, Some(60), false));
        assert_eq!(store.get::<Value>("test:ns:1"), Some(value));
    }

    #[test]
    fn test_get_missing_is_none() {
        let (_, store) = store();
        assert_eq!(store.get::<Value>("test:ns:missing"), None);
        assert_eq!(store.stats.snapshot(true, "memory", 0).misses, 1);
    }

    #[test]
    fn test_only_if_absent() {
        let (_, store) = store();

        assert!(store.set("k", &1, None, true));
        assert!(!store.set("k", &2, None, true));
        assert_eq!(store.get::<i64>("k"), Some(1));
    }

    #[test]
    fn test_zero_ttl_removes_entry() {
        let (backend, store) = store();
        store.set("k", &"old", Some(60), false);

        store.set("k", &"new", Some(0), false);
        assert!(backend.is_empty());
        assert_eq!(store.get::<String>("k"), None);
    }

    #[test]
    fn test_zero_ttl_only_if_absent_keeps_existing_entry() {
        let (backend, store) = store();
        store.set("k", &"old", Some(60), false);

        assert!(!store.set("k", &"new", Some(0), true));
        assert_eq!(backend.len(), 1);
        assert_eq!(store.get::<String>("k"), Some("old".to_string()));
    }

    #[tokio::test]
    async fn test_zero_ttl_only_if_absent_keeps_existing_entry_async() {
        let (_, store) = store();
        store.set_async("k", &"old", Some(60), false).await;

        assert!(!store.set_async("k", &"new", Some(0), true).await);
        assert_eq!(store.get_async::<String>("k").await, Some("old".to_string()));
    }

    #[test]
    fn test_undecodable_payload_is_miss() {
        let (backend, store) = store();
        backend.set("k", b"not json", None, false).unwrap();

        assert_eq!(store.get::<Value>("k"), None);
    }

    #[test]
    fn test_wrong_type_is_miss() {
        let (_, store) = store();
        store.set("k", &"text", None, false);
        assert_eq!(store.get::<i64>("k"), None);
    }

    #[test]
    fn test_delete() {
        let (_, store) = store();
        store.set("k", &1, None, false);

        assert!(store.delete("k"));
        assert!(!store.delete("k"));
    }

    #[test]
    fn test_clear_namespace_only_touches_namespace() {
        let (backend, store) = store();
        let ticker_args = ["AAPL", "MSFT", "GOOG"];

        for symbol in ticker_args {
            let key = store.generate_key("ticker", &CallArgs::new().kwarg("ticker", symbol));
            assert!(store.set(&key, &symbol, Some(60), false));
        }
        let market_key = store.generate_key("market", &CallArgs::new().kwarg("market", "US"));
        store.set(&market_key, &"US", Some(60), false);

        assert_eq!(store.clear_namespace("ticker"), 3);
        assert_eq!(backend.len(), 1);
        assert_eq!(store.get::<String>(&market_key), Some("US".to_string()));
        assert_eq!(store.clear_namespace("ticker"), 0);
    }

    #[test]
    fn test_ttl_query() {
        let (_, store) = store();
        store.set("short", &1, Some(30), false);
        store.set("forever", &1, None, false);

        assert!(matches!(store.ttl("short"), KeyTtl::Expires(t) if t <= 30 && t >= 29));
        assert_eq!(store.ttl("forever"), KeyTtl::Persistent);
        assert_eq!(store.ttl("missing"), KeyTtl::Missing);
    }

    #[test]
    fn test_unavailable_backend_never_errors() {
        let (backend, store) = store();
        store.set("k", &1, None, false);
        backend.set_available(false);

        assert!(!store.is_available());
        assert!(!store.set("k", &2, None, false));
        assert_eq!(store.get::<i64>("k"), None);
        assert!(!store.delete("k"));
        assert_eq!(store.clear_namespace("anything"), 0);
        assert_eq!(store.ttl("k"), KeyTtl::Missing);
    }

    #[test]
    fn test_disabled_store() {
        let store = CacheStore::disabled("test");

        assert!(!store.is_available());
        assert!(!store.set("k", &1, None, false));
        assert_eq!(store.get::<i64>("k"), None);
        assert_eq!(store.backend_name(), "disabled");
    }

    #[tokio::test]
    async fn test_async_round_trip_and_clear() {
        let (_, store) = store();
        let key = store.generate_key("ticker", &CallArgs::new().kwarg("ticker", "AAPL"));

        assert!(store.is_available_async().await);
        assert!(store.set_async(&key, &json!([1, 2, 3]), Some(60), false).await);
        assert_eq!(store.get_async::<Value>(&key).await, Some(json!([1, 2, 3])));
        assert!(matches!(store.ttl_async(&key).await, KeyTtl::Expires(_)));
        assert_eq!(store.clear_namespace_async("ticker").await, 1);
        assert!(!store.delete_async(&key).await);
    }

    #[tokio::test]
    async fn test_stats_snapshot() {
        let (backend, store) = store();
        store.set("test:a:1", &1, None, false);
        store.get::<i64>("test:a:1");
        store.get::<i64>("test:a:2");

        let stats = store.stats().await;
        assert!(stats.available);
        assert_eq!(stats.backend, "memory");
        assert_eq!(stats.key_count, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.writes, 1);

        backend.set_available(false);
        let stats = store.stats().await;
        assert!(!stats.available);
        assert_eq!(stats.key_count, 0);
    }

    #[tokio::test]
    async fn test_connect_reports_outcome() {
        let (backend, store) = store();
        assert!(store.connect().await);

        backend.set_available(false);
        assert!(!store.connect().await);
        assert!(!CacheStore::disabled("x").connect().await);
    }
}
