//! TTL cache for externally fetched data
//!
//! Plain key-value semantics with per-entry expiry. There is no size bound:
//! entity lists are small and fixed, so time is the only eviction policy.
//! Expired entries are evicted lazily by the lookup that finds them.
//!
//! Keys follow the `source:qualifier` convention so adapters sharing one
//! cache never collide.

use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Stored value plus its absolute expiry
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

/// Process-wide TTL cache
#[derive(Debug)]
pub struct TtlCache<V> {
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Look up a live entry
    ///
    /// An entry whose expiry has passed is removed and reported absent.
    pub async fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.entries.lock().await;

        let expired = match entries.get(key) {
            Some(entry) if Instant::now() < entry.expires_at => {
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            entries.remove(key);
            tracing::debug!(key = %key, "Cache entry expired");
        }

        None
    }

    /// Store a value, replacing any previous entry wholesale
    pub async fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.entries.lock().await.insert(key.into(), entry);
    }

    /// Drop an entry regardless of expiry
    pub async fn remove(&self, key: &str) -> Option<V> {
        self.entries.lock().await.remove(key).map(|e| e.value)
    }

    /// Number of stored entries, including expired ones not yet evicted
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Sweep all expired entries, returning how many were removed
    ///
    /// Never called by the batch loop; available to long-running hosts.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, entry| now < entry.expires_at);
        before - entries.len()
    }
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new()
    }
}
