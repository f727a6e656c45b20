//! Cache-Aside Module
//!
//! Wraps a data-producing operation with lookup-then-compute-then-store.
//! A `CachedOperation` is built once per logical operation and then invoked
//! with the call's arguments and the work to run on a miss:
//!
//! ```ignore
//! let history = cache
//!     .operation("ticker_history", CacheDuration::OneDay, true)
//!     .with_key_prefix("ticker");
//!
//! let rows = history
//!     .fetch(&CallArgs::new().kwarg("ticker", "AAPL"), || provider.history("AAPL"))
//!     .await?;
//! ```
//!
//! Store failures only ever turn into cache misses. Errors from the wrapped
//! operation are returned unchanged and are never cached.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::cache::expiration::{policy_for_attribute, CacheDuration, ExpirationPolicy};
use crate::cache::key::CallArgs;
use crate::cache::store::CacheStore;
use crate::data::{guard, sanitize, RawValue, SanitizedValue};
use crate::error::{Result, ServiceError};
use crate::metrics::MetricsTracker;

// == Cache Aside ==
/// Factory for cached operations sharing one store and one tracker.
#[derive(Debug, Clone)]
pub struct CacheAside {
    store: Arc<CacheStore>,
    metrics: Arc<MetricsTracker>,
}

impl CacheAside {
    pub fn new(store: Arc<CacheStore>, metrics: Arc<MetricsTracker>) -> Self {
        Self { store, metrics }
    }

    pub fn store(&self) -> &Arc<CacheStore> {
        &self.store
    }

    pub fn metrics(&self) -> &Arc<MetricsTracker> {
        &self.metrics
    }

    /// Declares an operation cached for `duration`.
    pub fn operation(
        &self,
        name: impl Into<String>,
        duration: CacheDuration,
        invalidate_at_midnight: bool,
    ) -> CachedOperation {
        self.with_policy(name, ExpirationPolicy::new(duration, invalidate_at_midnight))
    }

    /// Declares an operation for a provider attribute, using its table policy.
    pub fn attribute(&self, attribute: &str) -> CachedOperation {
        self.with_policy(attribute, policy_for_attribute(attribute, false))
    }

    pub fn with_policy(&self, name: impl Into<String>, policy: ExpirationPolicy) -> CachedOperation {
        CachedOperation {
            name: name.into(),
            key_prefix: None,
            policy,
            store: Arc::clone(&self.store),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

// == Cached Operation ==
#[derive(Debug, Clone)]
pub struct CachedOperation {
    name: String,
    key_prefix: Option<String>,
    policy: ExpirationPolicy,
    store: Arc<CacheStore>,
    metrics: Arc<MetricsTracker>,
}

impl CachedOperation {
    /// Stores keys under `prefix` instead of the operation name.
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Namespace the keys of this operation live under.
    pub fn namespace(&self) -> &str {
        self.key_prefix.as_deref().unwrap_or(&self.name)
    }

    pub fn policy(&self) -> ExpirationPolicy {
        self.policy
    }

    pub fn key(&self, args: &CallArgs) -> String {
        self.store.generate_key(self.namespace(), args)
    }

    /// TTL an entry written now would get.
    pub fn ttl(&self) -> u64 {
        self.policy.resolve()
    }

    // == Suspension-Based Call ==
    /// Returns the cached value for `args`, or awaits `f` and caches its result.
    pub async fn call<T, E, F, Fut>(&self, args: &CallArgs, f: F) -> std::result::Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        let started = Instant::now();
        let result = self.call_inner(args, f).await;
        self.record(started, result.is_err());
        result
    }

    async fn call_inner<T, E, F, Fut>(&self, args: &CallArgs, f: F) -> std::result::Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        if !self.store.is_available_async().await {
            return f().await;
        }

        let key = self.key(args);
        if let Some(hit) = self.store.get_async::<T>(&key).await {
            debug!("cache hit for {} ({})", self.name, key);
            return Ok(hit);
        }

        debug!("cache miss for {} ({})", self.name, key);
        let value = f().await?;
        self.store.set_async(&key, &value, Some(self.ttl()), false).await;
        Ok(value)
    }

    // == Blocking Call ==
    /// Blocking counterpart of `call`.
    pub fn call_blocking<T, E, F>(&self, args: &CallArgs, f: F) -> std::result::Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> std::result::Result<T, E>,
    {
        let started = Instant::now();
        let result = self.call_blocking_inner(args, f);
        self.record(started, result.is_err());
        result
    }

    fn call_blocking_inner<T, E, F>(&self, args: &CallArgs, f: F) -> std::result::Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> std::result::Result<T, E>,
    {
        if !self.store.is_available() {
            return f();
        }

        let key = self.key(args);
        if let Some(hit) = self.store.get::<T>(&key) {
            debug!("cache hit for {} ({})", self.name, key);
            return Ok(hit);
        }

        debug!("cache miss for {} ({})", self.name, key);
        let value = f()?;
        self.store.set(&key, &value, Some(self.ttl()), false);
        Ok(value)
    }

    // == Data Endpoints ==
    /// Like `call`, for provider data: the raw result is sanitized before it
    /// is stored, and the not-found guard runs on hits and misses alike.
    pub async fn fetch<F, Fut>(&self, args: &CallArgs, f: F) -> Result<SanitizedValue>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<RawValue, ServiceError>>,
    {
        let value = self
            .call(args, || async move { f().await.map(|raw| sanitize(&raw)) })
            .await?;
        guard(value, args)
    }

    /// Blocking counterpart of `fetch`.
    pub fn fetch_blocking<F>(&self, args: &CallArgs, f: F) -> Result<SanitizedValue>
    where
        F: FnOnce() -> std::result::Result<RawValue, ServiceError>,
    {
        let value = self.call_blocking(args, || f().map(|raw| sanitize(&raw)))?;
        guard(value, args)
    }

    fn record(&self, started: Instant, is_error: bool) {
        self.metrics
            .record_call(&self.name, started.elapsed().as_secs_f64(), is_error);
    }
}
