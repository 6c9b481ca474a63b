//! In-process memory cache.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::observability::metrics;

/// Default sweep period for expired entries.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(360);

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// A thread-safe key/value cache with optional per-entry expiry.
#[derive(Clone, Default)]
pub struct MemoryCache {
    inner: Arc<DashMap<String, Entry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value`; a zero `ttl` never expires.
    pub fn put(&self, key: impl Into<String>, value: impl Into<String>, ttl: Duration) {
        let expires_at = (!ttl.is_zero()).then(|| Instant::now() + ttl);
        self.inner.insert(
            key.into(),
            Entry {
                value: value.into(),
                expires_at,
            },
        );
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let entry = self.inner.get(key)?;
        if entry.is_expired(Instant::now()) {
            return None;
        }
        Some(entry.value.clone())
    }

    pub fn is_exist(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn delete(&self, key: &str) -> bool {
        self.inner.remove(key).is_some()
    }

    pub fn clear_all(&self) {
        self.inner.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Drop every expired entry; returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.inner.len();
        self.inner.retain(|_, entry| !entry.is_expired(now));
        let removed = before.saturating_sub(self.inner.len());
        metrics::record_cache_size(self.inner.len());
        removed
    }

    /// Sweep on a fixed interval until shutdown.
    pub fn spawn_sweeper(
        &self,
        interval: Duration,
        mut shutdown: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        let cache = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = cache.sweep();
                        if removed > 0 {
                            tracing::debug!(removed, "Expired cache entries swept");
                        }
                    }
                    _ = shutdown.recv() => break,
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_get_delete() {
        let cache = MemoryCache::new();
        assert!(cache.get("topic:1").is_none());

        cache.put("topic:1", "Rust", Duration::ZERO);
        assert_eq!(cache.get("topic:1").as_deref(), Some("Rust"));
        assert!(cache.is_exist("topic:1"));

        assert!(cache.delete("topic:1"));
        assert!(!cache.delete("topic:1"));
        assert!(cache.is_empty());
    }

    #[test]
    fn expired_entries_are_hidden_then_swept() {
        let cache = MemoryCache::new();
        cache.put("short", "x", Duration::from_millis(10));
        cache.put("long", "y", Duration::from_secs(600));
        std::thread::sleep(Duration::from_millis(30));

        assert!(cache.get("short").is_none());
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.sweep(), 1);
        assert_eq!(cache.get("long").as_deref(), Some("y"));
    }

    #[tokio::test]
    async fn sweeper_stops_on_shutdown() {
        let cache = MemoryCache::new();
        cache.put("k", "v", Duration::from_millis(1));
        let (tx, rx) = broadcast::channel(1);

        let task = cache.spawn_sweeper(Duration::from_millis(10), rx);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(cache.is_empty());

        tx.send(()).unwrap();
        task.await.unwrap();
    }
}
