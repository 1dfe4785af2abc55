#[cfg(feature = "stats")]
use crate::CacheStats;
use crate::error::{CacheError, CacheResult};
use crate::flight::{Flight, FlightGuard};
use crate::state::{CacheState, Lookup};
use crate::{CacheConfig, Cacheable, MemoryStore, Store, Sweeper};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// A thread-safe TTL cache in front of a fallible fetch operation.
///
/// `FetchCache` combines three per-key structures:
///
/// - **Values** with an absolute expiry, held by the [`Store`]
///   (a [`MemoryStore`] unless configured otherwise)
/// - **Access counters**, bumped once per [`get_or_fetch`](Self::get_or_fetch)
///   call whether it hits, misses or fails
/// - **In-flight markers**, so that at most one fetch runs per key; callers
///   that miss while a fetch is running block until it finishes and receive
///   its result instead of fetching again
///
/// # Thread Safety
///
/// Every map is a [`DashMap`], so callers working on different keys only
/// contend when their keys share a shard. No lock is held while the fetch
/// closure runs. Waiters block on a `parking_lot` condition variable.
///
/// Share a cache between threads with `Arc<FetchCache<..>>` or scoped
/// threads; there is no global instance.
///
/// # Caching rules
///
/// | Fetch outcome | Stored? | Returned to |
/// |---|---|---|
/// | `Ok(value)`, value cacheable, `ttl > 0` | yes, until `now + ttl` | caller and joiners |
/// | `Ok(value)`, value empty (see [`Cacheable`]) | no | caller and joiners |
/// | `Ok(value)`, `ttl == 0` | no | caller and joiners |
/// | `Err(e)` | no | caller and joiners, as [`CacheError::Fetch`] |
///
/// # Examples
///
/// ```
/// use fetchcache_core::FetchCache;
/// use std::time::Duration;
///
/// let cache: FetchCache<String> = FetchCache::new();
/// let ttl = Duration::from_secs(10);
///
/// let page = cache
///     .get_or_fetch("https://example.com", ttl, || {
///         Ok::<_, std::io::Error>("<html>".to_string())
///     })
///     .unwrap();
/// assert_eq!(page, "<html>");
///
/// // Served from cache: the closure is not called.
/// let again = cache
///     .get_or_fetch("https://example.com", ttl, || -> Result<String, std::io::Error> {
///         unreachable!()
///     })
///     .unwrap();
/// assert_eq!(again, "<html>");
/// assert_eq!(cache.access_count("https://example.com"), 2);
/// ```
pub struct FetchCache<V, S = MemoryStore<V>> {
    state: CacheState<V, S>,
    flights: DashMap<String, Arc<Flight<V>>>,
}

enum Claim<'a, V: Clone> {
    Leader(FlightGuard<'a, V>),
    Joined(Arc<Flight<V>>),
    Ready(V),
}

impl<V> FetchCache<V>
where
    V: Clone + Cacheable + Send + Sync,
{
    /// Creates an in-memory cache with default settings.
    pub fn new() -> Self {
        Self::with_store(MemoryStore::new())
    }

    /// Returns a builder for configuring the cache name, default TTL,
    /// caching predicate and store.
    pub fn builder() -> FetchCacheBuilder<V> {
        FetchCacheBuilder::new()
    }
}

impl<V> Default for FetchCache<V>
where
    V: Clone + Cacheable + Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V, S> FetchCache<V, S>
where
    V: Clone + Cacheable,
    S: Store<V>,
{
    /// Creates a cache with default settings in front of `store`.
    pub fn with_store(store: S) -> Self {
        Self::with_config(CacheConfig::new(), store)
    }

    /// Creates a cache from an explicit configuration and store.
    pub fn with_config(config: CacheConfig<V>, store: S) -> Self {
        Self {
            state: CacheState::new(config, store),
            flights: DashMap::new(),
        }
    }

    /// Returns the cached value for `key`, or runs `fetch` to produce it.
    ///
    /// # Behavior
    ///
    /// 1. The access counter for `key` is incremented.
    /// 2. A fresh cached value is returned immediately.
    /// 3. Otherwise, if a fetch for `key` is already running, this call blocks
    ///    until it finishes and returns the same result, success or failure.
    /// 4. Otherwise `fetch` runs on the calling thread. Its value is stored
    ///    for `ttl` if it is cacheable and `ttl` is non-zero, then handed to
    ///    this caller and every caller that joined in step 3.
    ///
    /// A failed fetch is never cached, so the next call retries it.
    ///
    /// # Errors
    ///
    /// - [`CacheError::InvalidArgument`] for an empty key; nothing is counted.
    /// - [`CacheError::Fetch`] wrapping the error returned by `fetch` (or by
    ///   the fetch that this call joined).
    /// - [`CacheError::Abandoned`] if the joined fetch panicked.
    pub fn get_or_fetch<F, E>(&self, key: &str, ttl: Duration, fetch: F) -> CacheResult<V>
    where
        F: FnOnce() -> Result<V, E>,
        E: Into<Box<dyn StdError + Send + Sync + 'static>>,
    {
        if let Lookup::Hit(value) = self.state.begin(key)? {
            return Ok(value);
        }

        match self.claim(key) {
            Claim::Ready(value) => {
                self.state.record_join(key);
                Ok(value)
            }
            Claim::Joined(flight) => {
                self.state.record_join(key);
                flight.wait()
            }
            Claim::Leader(guard) => {
                self.state.record_fetch(key, ttl);
                let outcome = fetch().map_err(|err| CacheError::fetch(key, err));
                self.state.settle(key, ttl, &outcome);
                guard.release(outcome.clone());
                outcome
            }
        }
    }

    /// [`get_or_fetch`](Self::get_or_fetch) with the configured default TTL.
    pub fn get_or_fetch_default<F, E>(&self, key: &str, fetch: F) -> CacheResult<V>
    where
        F: FnOnce() -> Result<V, E>,
        E: Into<Box<dyn StdError + Send + Sync + 'static>>,
    {
        self.get_or_fetch(key, self.state.config().ttl(), fetch)
    }

    /// Number of `get_or_fetch` calls made for `key`, 0 if none.
    pub fn access_count(&self, key: &str) -> u64 {
        self.state.access_count(key)
    }

    /// The fresh cached value for `key`, without counting or fetching.
    pub fn peek(&self, key: &str) -> Option<V> {
        self.state.peek(key)
    }

    /// Drops the cached value for `key`. The access count is kept.
    pub fn invalidate(&self, key: &str) -> bool {
        self.state.invalidate(key)
    }

    /// Drops every cached value. Access counts are kept.
    pub fn clear(&self) {
        self.state.clear()
    }

    /// Removes expired values, returning how many were dropped.
    pub fn purge_expired(&self) -> usize {
        self.state.purge_expired()
    }

    /// Stored values, including expired ones that have not been purged yet.
    pub fn len(&self) -> usize {
        self.state.len()
    }

    /// Returns true if no values are stored.
    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }

    /// Number of fetches currently running.
    pub fn in_flight(&self) -> usize {
        self.flights.len()
    }

    /// The cache name used in log events and sweeper thread names.
    pub fn name(&self) -> &str {
        self.state.name()
    }

    /// The backing store, for inspection or direct access.
    pub fn store(&self) -> &S {
        self.state.store()
    }

    /// Hit, miss, join and fetch counters for this cache.
    #[cfg(feature = "stats")]
    pub fn stats(&self) -> &CacheStats {
        self.state.stats()
    }

    /// Starts a background thread purging expired values every `interval`.
    ///
    /// See [`Sweeper`] for the thread's lifetime.
    pub fn spawn_sweeper(&self, interval: Duration) -> CacheResult<Sweeper>
    where
        V: 'static,
        S: 'static,
    {
        Sweeper::spawn::<V, S>(self.state.store(), interval, self.state.name())
    }

    fn claim<'a>(&'a self, key: &'a str) -> Claim<'a, V> {
        match self.flights.entry(key.to_string()) {
            Entry::Occupied(occupied) => Claim::Joined(Arc::clone(occupied.get())),
            Entry::Vacant(vacant) => {
                // A leader stores its value before dropping its marker, so a
                // value that landed since our miss is visible here.
                if let Some(value) = self.state.recheck(key) {
                    return Claim::Ready(value);
                }
                let flight = Arc::new(Flight::new());
                vacant.insert(Arc::clone(&flight));
                Claim::Leader(FlightGuard::new(&self.flights, key, flight))
            }
        }
    }
}

impl<V: Clone, S> fmt::Debug for FetchCache<V, S>
where
    V: Cacheable,
    S: Store<V>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchCache")
            .field("name", &self.state.name())
            .field("entries", &self.state.len())
            .field("in_flight", &self.flights.len())
            .finish()
    }
}

/// Builder for [`FetchCache`].
///
/// # Examples
///
/// ```
/// use fetchcache_core::{FetchCache, MemoryStore};
/// use std::time::Duration;
///
/// let cache = FetchCache::<Vec<u8>>::builder()
///     .name("avatars")
///     .default_ttl(Duration::from_secs(300))
///     .store(MemoryStore::new())
///     .build();
///
/// assert_eq!(cache.name(), "avatars");
/// ```
pub struct FetchCacheBuilder<V, S = MemoryStore<V>> {
    config: CacheConfig<V>,
    store: S,
}

impl<V> FetchCacheBuilder<V> {
    /// Creates a builder with default settings and an in-memory store.
    pub fn new() -> Self {
        Self {
            config: CacheConfig::new(),
            store: MemoryStore::new(),
        }
    }
}

impl<V> Default for FetchCacheBuilder<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V, S> FetchCacheBuilder<V, S> {
    /// Sets the cache name used in log events.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config = self.config.name(name);
        self
    }

    /// Sets the TTL used by `get_or_fetch_default`.
    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.config = self.config.default_ttl(ttl);
        self
    }

    /// Stores a fetched value only when `predicate` returns true.
    pub fn cache_if<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&V) -> bool + Send + Sync + 'static,
    {
        self.config = self.config.cache_if(predicate);
        self
    }

    /// Uses `store` instead of an in-memory store.
    pub fn store<S2>(self, store: S2) -> FetchCacheBuilder<V, S2> {
        FetchCacheBuilder {
            config: self.config,
            store,
        }
    }

    /// Builds the cache.
    pub fn build(self) -> FetchCache<V, S>
    where
        V: Clone + Cacheable,
        S: Store<V>,
    {
        FetchCache::with_config(self.config, self.store)
    }
}
