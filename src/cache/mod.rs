//! Cache Module
//!
//! Key derivation, expiration policy, the store façade over a pluggable
//! backend, and the cache-aside wrapper built on top of them.

mod aside;
pub mod backend;
mod entry;
mod expiration;
mod key;
mod lru;
mod stats;
mod store;


// Re-export public types
pub use aside::{CacheAside, CachedOperation};
pub use backend::{CacheBackend, KeyTtl, MemoryBackend, RedisBackend, RedisSettings};
pub use entry::CacheEntry;
pub use expiration::{
    policy_for_attribute, resolve_ttl, resolve_ttl_at, seconds_until_midnight, CacheDuration,
    ExpirationPolicy,
};
pub use key::{generate_key, namespace_pattern, CallArgs};
pub use lru::LruTracker;
pub use stats::{CacheStats, StatsCounters};
pub use store::CacheStore;
