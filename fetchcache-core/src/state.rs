#[cfg(feature = "stats")]
use crate::CacheStats;
use crate::error::CacheResult;
use crate::utils::{ttl_millis, validate_key};
use crate::{CacheConfig, Cacheable, Store};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Outcome of the counted lookup that opens every `get_or_fetch` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<V> {
    Hit(V),
    Miss,
}

/// Everything a fetch cache owns apart from its in-flight table.
///
/// The blocking [`FetchCache`](crate::FetchCache) and the async cache only
/// differ in how callers wait for an in-flight fetch. Counting, lookup, the
/// store-or-skip decision after a fetch, statistics and logging live here so
/// both flavours behave identically.
pub struct CacheState<V, S> {
    config: CacheConfig<V>,
    store: Arc<S>,
    #[cfg(feature = "stats")]
    stats: CacheStats,
}

impl<V, S> CacheState<V, S>
where
    V: Clone + Cacheable,
    S: Store<V>,
{
    pub fn new(config: CacheConfig<V>, store: S) -> Self {
        Self {
            config,
            store: Arc::new(store),
            #[cfg(feature = "stats")]
            stats: CacheStats::new(),
        }
    }

    pub fn config(&self) -> &CacheConfig<V> {
        &self.config
    }

    pub fn name(&self) -> &str {
        self.config.cache_name()
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    #[cfg(feature = "stats")]
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Validates `key`, counts the access and looks for a fresh value.
    ///
    /// The access counter is bumped before the lookup, so it moves exactly
    /// once per call whatever the call's outcome. An invalid key fails before
    /// anything is counted.
    pub fn begin(&self, key: &str) -> CacheResult<Lookup<V>> {
        validate_key(key)?;
        let count = self.store.incr(key);

        match self.store.get(key) {
            Some(value) => {
                #[cfg(feature = "stats")]
                self.stats.record_hit();
                trace!(cache = %self.name(), key, count, "cache hit");
                Ok(Lookup::Hit(value))
            }
            None => {
                #[cfg(feature = "stats")]
                self.stats.record_miss();
                debug!(cache = %self.name(), key, count, "cache miss");
                Ok(Lookup::Miss)
            }
        }
    }

    /// Uncounted lookup used after taking the in-flight slot, to catch a
    /// fetch that completed between [`begin`](Self::begin) and the claim.
    pub fn recheck(&self, key: &str) -> Option<V> {
        self.store.get(key)
    }

    pub fn record_join(&self, key: &str) {
        #[cfg(feature = "stats")]
        self.stats.record_join();
        debug!(cache = %self.name(), key, "joining in-flight fetch");
    }

    pub fn record_fetch(&self, key: &str, ttl: Duration) {
        #[cfg(feature = "stats")]
        self.stats.record_fetch();
        debug!(cache = %self.name(), key, ttl_ms = ttl_millis(ttl), "fetching");
    }

    /// Applies the result of a completed fetch to the store.
    ///
    /// Only successful, cacheable values with a non-zero TTL are stored.
    /// Failures are logged and left for the next caller to retry.
    pub fn settle(&self, key: &str, ttl: Duration, outcome: &CacheResult<V>) {
        match outcome {
            Ok(_) if ttl.is_zero() => {
                debug!(cache = %self.name(), key, "zero ttl, value not stored");
            }
            Ok(value) if !self.config.should_cache(value) => {
                #[cfg(feature = "stats")]
                self.stats.record_uncacheable();
                debug!(cache = %self.name(), key, "empty value, not stored");
            }
            Ok(value) => {
                self.store.set_ex(key, value.clone(), ttl);
                debug!(cache = %self.name(), key, ttl_ms = ttl_millis(ttl), "value stored");
            }
            Err(err) => {
                #[cfg(feature = "stats")]
                self.stats.record_failure();
                warn!(cache = %self.name(), key, error = %err, "fetch failed");
            }
        }
    }

    pub fn access_count(&self, key: &str) -> u64 {
        self.store.count(key)
    }

    pub fn peek(&self, key: &str) -> Option<V> {
        self.store.get(key)
    }

    pub fn invalidate(&self, key: &str) -> bool {
        let removed = self.store.remove(key);
        if removed {
            debug!(cache = %self.name(), key, "entry invalidated");
        }
        removed
    }

    pub fn clear(&self) {
        self.store.clear();
        debug!(cache = %self.name(), "cache cleared");
    }

    pub fn purge_expired(&self) -> usize {
        let removed = self.store.purge_expired();
        if removed > 0 {
            debug!(cache = %self.name(), removed, "purged expired entries");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CacheError;
    use crate::MemoryStore;

    fn state() -> CacheState<String, MemoryStore<String>> {
        CacheState::new(CacheConfig::new().name("test"), MemoryStore::new())
    }

    #[test]
    fn test_begin_counts_before_lookup() {
        let state = state();
        assert_eq!(state.begin("a").unwrap(), Lookup::Miss);
        assert_eq!(state.access_count("a"), 1);

        state.settle("a", Duration::from_secs(10), &Ok("x".to_string()));
        assert_eq!(state.begin("a").unwrap(), Lookup::Hit("x".to_string()));
        assert_eq!(state.access_count("a"), 2);
    }

    #[test]
    fn test_empty_key_is_not_counted() {
        let state = state();
        assert!(matches!(
            state.begin(""),
            Err(CacheError::InvalidArgument { .. })
        ));
        assert_eq!(state.access_count(""), 0);
    }

    #[test]
    fn test_settle_skips_empty_zero_ttl_and_errors() {
        let state = state();
        state.settle("empty", Duration::from_secs(10), &Ok(String::new()));
        state.settle("zero", Duration::ZERO, &Ok("x".to_string()));
        state.settle("err", Duration::from_secs(10), &Err(CacheError::fetch("err", "boom")));

        assert!(state.is_empty());
        assert_eq!(state.peek("empty"), None);
        assert_eq!(state.peek("zero"), None);
        assert_eq!(state.peek("err"), None);
    }

    #[cfg(feature = "stats")]
    #[test]
    fn test_stats_follow_lifecycle() {
        let state = state();
        state.begin("a").unwrap();
        state.record_fetch("a", Duration::from_secs(1));
        state.settle("a", Duration::from_secs(1), &Ok(String::new()));
        state.begin("a").unwrap();
        state.record_join("a");

        let stats = state.stats();
        assert_eq!(stats.misses(), 2);
        assert_eq!(stats.fetches(), 1);
        assert_eq!(stats.joins(), 1);
        assert_eq!(stats.uncacheable(), 1);
    }

    #[test]
    fn test_invalidate_keeps_count() {
        let state = state();
        state.begin("a").unwrap();
        state.settle("a", Duration::from_secs(10), &Ok("x".to_string()));

        assert!(state.invalidate("a"));
        assert!(!state.invalidate("a"));
        assert_eq!(state.peek("a"), None);
        assert_eq!(state.access_count("a"), 1);
    }
}
