//! Cache Backends
//!
//! The `CacheBackend` trait is the seam between `CacheStore` and the
//! physical key-value store. Every operation exists in a blocking form and a
//! suspension-based form; the async forms default to the blocking ones,
//! which suits backends whose work never leaves the process.

mod memory;
mod redis;

use async_trait::async_trait;

use crate::error::StoreResult;

pub use self::memory::MemoryBackend;
pub use self::redis::{RedisBackend, RedisSettings};

/// Remaining lifetime of a stored key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTtl {
    /// Key does not exist
    Missing,
    /// Key exists without expiration
    Persistent,
    /// Key expires in this many seconds
    Expires(u64),
}

impl KeyTtl {
    /// Maps the Redis `TTL` reply convention (-2 missing, -1 persistent).
    pub fn from_reply(reply: i64) -> Self {
        match reply {
            -2 => KeyTtl::Missing,
            r if r < 0 => KeyTtl::Persistent,
            r => KeyTtl::Expires(r as u64),
        }
    }
}

// == Cache Backend ==
/// Raw byte store used by `CacheStore`.
///
/// Implementations report failures as `StoreError`; deciding what a
/// failure means for callers is the store's job.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Short name used in logs and stats.
    fn name(&self) -> &'static str;

    fn ping(&self) -> StoreResult<()>;

    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Writes `value`. With `only_if_absent`, returns false when the key
    /// already existed and nothing was written.
    fn set(&self, key: &str, value: &[u8], ttl: Option<u64>, only_if_absent: bool)
        -> StoreResult<bool>;

    /// Deletes every listed key, returning how many existed.
    fn delete(&self, keys: &[String]) -> StoreResult<u64>;

    /// Lists keys matching a glob pattern (`*` wildcards).
    fn keys(&self, pattern: &str) -> StoreResult<Vec<String>>;

    fn ttl(&self, key: &str) -> StoreResult<KeyTtl>;

    async fn ping_async(&self) -> StoreResult<()> {
        self.ping()
    }

    async fn get_async(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        self.get(key)
    }

    async fn set_async(
        &self,
        key: &str,
        value: &[u8],
        ttl: Option<u64>,
        only_if_absent: bool,
    ) -> StoreResult<bool> {
        self.set(key, value, ttl, only_if_absent)
    }

    async fn delete_async(&self, keys: &[String]) -> StoreResult<u64> {
        self.delete(keys)
    }

    async fn keys_async(&self, pattern: &str) -> StoreResult<Vec<String>> {
        self.keys(pattern)
    }

    async fn ttl_async(&self, key: &str) -> StoreResult<KeyTtl> {
        self.ttl(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_reply_mapping() {
        assert_eq!(KeyTtl::from_reply(-2), KeyTtl::Missing);
        assert_eq!(KeyTtl::from_reply(-1), KeyTtl::Persistent);
        assert_eq!(KeyTtl::from_reply(0), KeyTtl::Expires(0));
        assert_eq!(KeyTtl::from_reply(42), KeyTtl::Expires(42));
    }
}
