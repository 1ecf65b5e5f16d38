use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

pub const DEFAULT_TTL_SECS: i64 = 300;
pub const DEFAULT_MAX_SIZE: usize = 128;

/// Internal cache entry with timestamp
struct CacheEntry<T> {
    data: T,
    cached_at: DateTime<Utc>,
}

/// Bounded key/value store with lazy expiry.
///
/// An entry is visible while `now - cached_at <= ttl`. Reads never refresh the
/// timestamp, so eviction at capacity removes the oldest *insertion*.
pub struct TtlCache<T> {
    ttl: Duration,
    max_size: usize,
    store: Mutex<HashMap<String, CacheEntry<T>>>,
}

impl<T: Clone> TtlCache<T> {
    pub fn new(ttl_secs: i64, max_size: usize) -> Self {
        Self {
            ttl: Duration::seconds(ttl_secs),
            max_size,
            store: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry<T>>> {
        // A panic while holding the lock cannot leave the map half-updated
        self.store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns a copy of the value, removing the entry if it has expired.
    pub fn get(&self, key: &str) -> Option<T> {
        let mut store = self.lock();
        let expired = {
            let entry = store.get(key)?;
            Utc::now() - entry.cached_at > self.ttl
        };
        if expired {
            store.remove(key);
            tracing::trace!("cache entry expired: {}", key);
            return None;
        }
        store.get(key).map(|e| e.data.clone())
    }

    /// Insert or overwrite. A new key at capacity first evicts the oldest insertion.
    pub fn set(&self, key: impl Into<String>, value: T) {
        if self.max_size == 0 {
            return;
        }
        let key = key.into();
        let mut store = self.lock();

        if !store.contains_key(&key) && store.len() >= self.max_size {
            let oldest = store
                .iter()
                .min_by_key(|(_, e)| e.cached_at)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                store.remove(&oldest);
                tracing::trace!("cache evicted {}", oldest);
            }
        }

        store.insert(key, CacheEntry {
            data: value,
            cached_at: Utc::now(),
        });
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl<T: Clone> Default for TtlCache<T> {
    fn default() -> Self {
        Self::new(DEFAULT_TTL_SECS, DEFAULT_MAX_SIZE)
    }
}
