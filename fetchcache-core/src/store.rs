//! # Backing stores
//!
//! A [`Store`] holds the two per-key maps a fetch cache needs: expiring
//! values and access counters. The operations mirror a remote key-value
//! service (`GET`, `SET key value EX ttl`, `INCR`, `DEL`), so an out-of-process
//! backend can stand in for [`MemoryStore`] without changing the caching
//! contract.
//!
//! In-flight fetch tracking is never delegated to the store; it always lives
//! in the cache instance.
//!
//! # Requirements for implementations
//!
//! - `get` must never return a value whose TTL has elapsed.
//! - `set_ex` with a zero TTL must not store anything.
//! - `incr` must be atomic with respect to concurrent `incr` on the same key.
//! - Counters are independent of values: `remove`/`clear` leave them alone.

use crate::cache_entry::{expiry_after, CacheEntry};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Storage for cached values and access counters.
pub trait Store<V>: Send + Sync {
    /// Returns the value for `key` if present and not expired.
    fn get(&self, key: &str) -> Option<V>;

    /// Stores `value` under `key` for `ttl`, replacing any previous value.
    fn set_ex(&self, key: &str, value: V, ttl: Duration);

    /// Increments the access counter for `key` and returns the new count.
    fn incr(&self, key: &str) -> u64;

    /// Current access count for `key`, 0 if never incremented.
    fn count(&self, key: &str) -> u64;

    /// Removes the value for `key`. Returns true if a value was present.
    fn remove(&self, key: &str) -> bool;

    /// Drops expired values, returning how many were removed.
    fn purge_expired(&self) -> usize;

    /// Drops every stored value.
    fn clear(&self);

    /// Number of stored values, including expired ones not yet purged.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Key under which a remote backend keeps the access counter for `key`.
///
/// ```
/// assert_eq!(fetchcache_core::store::count_key("http://a"), "count:http://a");
/// ```
pub fn count_key(key: &str) -> String {
    format!("count:{key}")
}

/// Key under which a remote backend keeps the cached value for `key`.
///
/// ```
/// assert_eq!(fetchcache_core::store::result_key("http://a"), "result:http://a");
/// ```
pub fn result_key(key: &str) -> String {
    format!("result:{key}")
}

/// In-process store backed by sharded concurrent maps.
///
/// Both maps are [`DashMap`]s, so operations on different keys only contend
/// when they hash to the same shard. Expired values are removed lazily by
/// `get` or in bulk by `purge_expired`.
///
/// # Examples
///
/// ```
/// use fetchcache_core::{MemoryStore, Store};
/// use std::time::Duration;
///
/// let store = MemoryStore::new();
/// store.set_ex("a", "x".to_string(), Duration::from_secs(10));
/// assert_eq!(store.get("a"), Some("x".to_string()));
///
/// assert_eq!(store.incr("a"), 1);
/// assert_eq!(store.incr("a"), 2);
/// assert_eq!(store.count("a"), 2);
/// ```
#[derive(Debug)]
pub struct MemoryStore<V> {
    entries: DashMap<String, CacheEntry<V>>,
    counts: DashMap<String, AtomicU64>,
}

impl<V> MemoryStore<V> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            counts: DashMap::new(),
        }
    }

    /// Returns the raw entry for `key`, fresh or not.
    pub fn entry(&self, key: &str) -> Option<CacheEntry<V>>
    where
        V: Clone,
    {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// Snapshot of every access counter.
    pub fn counts(&self) -> Vec<(String, u64)> {
        self.counts
            .iter()
            .map(|counter| (counter.key().clone(), counter.value().load(Ordering::Relaxed)))
            .collect()
    }
}

impl<V> Default for MemoryStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Store<V> for MemoryStore<V>
where
    V: Clone + Send + Sync,
{
    fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        match self.entries.get(key) {
            Some(entry) if entry.is_fresh_at(now) => return Some(entry.value.clone()),
            Some(_) => {}
            None => return None,
        }

        // Stale: only remove it if nobody replaced it in the meantime.
        self.entries
            .remove_if(key, |_, entry| !entry.is_fresh_at(now));
        None
    }

    fn set_ex(&self, key: &str, value: V, ttl: Duration) {
        if ttl.is_zero() {
            return;
        }
        let now = Instant::now();
        let entry = CacheEntry::with_expiry(value, now, expiry_after(now, ttl));
        self.entries.insert(key.to_string(), entry);
    }

    fn incr(&self, key: &str) -> u64 {
        if let Some(counter) = self.counts.get(key) {
            return counter.fetch_add(1, Ordering::Relaxed) + 1;
        }
        self.counts
            .entry(key.to_string())
            .or_default()
            .fetch_add(1, Ordering::Relaxed)
            + 1
    }

    fn count(&self, key: &str) -> u64 {
        self.counts
            .get(key)
            .map_or(0, |counter| counter.load(Ordering::Relaxed))
    }

    fn remove(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_fresh_at(now));
        before.saturating_sub(self.entries.len())
    }

    fn clear(&self) {
        self.entries.clear();
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
