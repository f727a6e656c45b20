//! Expiry Sweep Task
//!
//! Background task that periodically drops expired entries from the
//! in-process backend. Reads already skip expired entries; the sweep only
//! reclaims their memory.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::MemoryBackend;

/// Spawns the sweep loop, running every `cleanup_interval_secs` seconds.
///
/// Pass the returned handle to `stop_cleanup_task` during shutdown.
///
/// # Example
/// ```ignore
/// let backend = Arc::new(MemoryBackend::new(10_000));
/// let sweep = spawn_cleanup_task(backend.clone(), 60);
/// // Later, during shutdown:
/// stop_cleanup_task(sweep).await;
/// ```
pub fn spawn_cleanup_task(backend: Arc<MemoryBackend>, cleanup_interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(cleanup_interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting expiry sweep with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = backend.cleanup_expired();
            if removed > 0 {
                info!("Expiry sweep: removed {} expired entries", removed);
            } else {
                debug!("Expiry sweep: no expired entries found");
            }
        }
    })
}

/// Aborts the sweep and waits for it to wind down.
pub async fn stop_cleanup_task(handle: JoinHandle<()>) {
    handle.abort();
    match handle.await {
        Err(e) if !e.is_cancelled() => debug!("Expiry sweep ended with error: {}", e),
        _ => info!("Expiry sweep stopped"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheBackend;

    #[tokio::test]
    async fn test_sweep_removes_expired_entries() {
        let backend = Arc::new(MemoryBackend::new(100));
        backend.set("expire_soon", b"value", Some(1), false).unwrap();

        let handle = spawn_cleanup_task(backend.clone(), 1);
        tokio::time::sleep(Duration::from_millis(2500)).await;

        // Gone from storage, not just hidden from reads
        assert_eq!(backend.len(), 0);

        handle.abort();
    }

    #[tokio::test]
    async fn test_sweep_preserves_live_entries() {
        let backend = Arc::new(MemoryBackend::new(100));
        backend.set("long_lived", b"value", Some(3600), false).unwrap();

        let handle = spawn_cleanup_task(backend.clone(), 1);
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert_eq!(backend.get("long_lived").unwrap(), Some(b"value".to_vec()));

        handle.abort();
    }

    #[tokio::test]
    async fn test_sweep_can_be_aborted() {
        let backend = Arc::new(MemoryBackend::new(100));
        let handle = spawn_cleanup_task(backend, 1);

        handle.abort();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished());
    }

    #[tokio::test]
    async fn test_stop_halts_the_sweep() {
        let backend = Arc::new(MemoryBackend::new(100));
        let handle = spawn_cleanup_task(backend.clone(), 1);

        stop_cleanup_task(handle).await;

        // Expired entries are no longer reclaimed once stopped
        backend.set("expire_soon", b"value", Some(1), false).unwrap();
        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(backend.len(), 1);
    }
}
