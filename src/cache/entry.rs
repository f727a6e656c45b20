//! Cache Entry Module
//!
//! A serialized value held by the in-process backend, with optional expiry.

use std::time::{SystemTime, UNIX_EPOCH};

// == Cache Entry ==
/// A stored blob with its expiration timestamp.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Serialized value
    pub value: Vec<u8>,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expires_at: Option<u64>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry that expires `ttl_seconds` from now, if given.
    pub fn new(value: Vec<u8>, ttl_seconds: Option<u64>) -> Self {
        let now = current_timestamp_ms();
        let expires_at = ttl_seconds.map(|ttl| now.saturating_add(ttl.saturating_mul(1000)));

        Self {
            value,
            expires_at,
        }
    }

    // == Is Expired ==
    /// An entry is expired once the current time reaches its expiration time.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        match self.expires_at {
            Some(expires) => now_ms >= expires,
            None => false,
        }
    }

    // == Time To Live ==
    /// Remaining TTL in whole seconds, rounded up; None if the entry never expires.
    pub fn ttl_remaining(&self) -> Option<u64> {
        self.expires_at.map(|expires| {
            let remaining_ms = expires.saturating_sub(current_timestamp_ms());
            remaining_ms.div_ceil(1000)
        })
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_without_ttl_never_expires() {
        let entry = CacheEntry::new(b"v".to_vec(), None);

        assert!(entry.expires_at.is_none());
        assert!(!entry.is_expired_at(u64::MAX));
        assert!(entry.ttl_remaining().is_none());
    }

    #[test]
    fn test_entry_with_ttl() {
        let entry = CacheEntry::new(b"v".to_vec(), Some(60));

        assert!(!entry.is_expired());
        let remaining = entry.ttl_remaining().unwrap();
        assert!((59..=60).contains(&remaining));
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let now = current_timestamp_ms();
        let entry = CacheEntry {
            value: Vec::new(),
            expires_at: Some(now + 1000),
        };

        assert!(!entry.is_expired_at(now + 999));
        assert!(entry.is_expired_at(now + 1000), "Entry should be expired at boundary");
    }

    #[test]
    fn test_huge_ttl_does_not_overflow() {
        let entry = CacheEntry::new(Vec::new(), Some(u64::MAX));
        assert_eq!(entry.expires_at, Some(u64::MAX));
    }
}
