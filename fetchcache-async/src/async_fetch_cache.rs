#[cfg(feature = "stats")]
use fetchcache_core::CacheStats;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use fetchcache_core::{
    CacheConfig, CacheError, CacheResult, CacheState, Cacheable, Lookup, MemoryStore, Store,
    Sweeper,
};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::error::Error as StdError;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::warn;

type SharedFetch<V> = Shared<BoxFuture<'static, CacheResult<V>>>;

/// In-flight marker: a fetch future every caller of the key can drive.
struct Flight<V> {
    id: u64,
    fetch: SharedFetch<V>,
}

struct Inner<V, S> {
    state: CacheState<V, S>,
    flights: DashMap<String, Flight<V>>,
    next_flight: AtomicU64,
}

/// An async TTL cache in front of a fallible fetch future.
///
/// `AsyncFetchCache` follows the same rules as the blocking
/// [`FetchCache`](fetchcache_core::FetchCache): one access-count increment per
/// call, fresh values served from cache, failed or empty results never
/// stored, and at most one fetch per key at a time. Callers that miss while a
/// fetch is running `.await` that fetch instead of starting their own.
///
/// # Cancellation
///
/// The fetch future is shared by every caller of the key, and whichever
/// caller polls it moves it forward. Dropping a caller's future (a timeout,
/// an aborted task, a `select!` branch that lost) only stops that caller
/// waiting; the fetch carries on for the others. If every caller goes away,
/// the half-finished fetch stays registered and the next caller of the key
/// resumes it.
///
/// Storing the value and clearing the in-flight marker are part of the shared
/// future itself, so they happen exactly once no matter which caller drives it
/// to completion.
///
/// # Cloning
///
/// `AsyncFetchCache` is a handle: clones share the same values, counters and
/// in-flight fetches. Cache operations never `.await` except on the fetch.
///
/// # Examples
///
/// ```
/// use fetchcache_async::AsyncFetchCache;
/// use std::time::Duration;
///
/// # futures::executor::block_on(async {
/// let cache: AsyncFetchCache<String> = AsyncFetchCache::new();
///
/// let page = cache
///     .get_or_fetch("https://example.com", Duration::from_secs(10), || async {
///         Ok::<_, std::io::Error>("<html>".to_string())
///     })
///     .await
///     .unwrap();
///
/// assert_eq!(page, "<html>");
/// assert_eq!(cache.access_count("https://example.com"), 1);
/// # });
/// ```
pub struct AsyncFetchCache<V, S = MemoryStore<V>> {
    inner: Arc<Inner<V, S>>,
}

enum Claim<V> {
    Leader(SharedFetch<V>),
    Joined(SharedFetch<V>),
    Ready(V),
}

impl<V> AsyncFetchCache<V>
where
    V: Clone + Cacheable + Send + Sync + 'static,
{
    /// Creates an in-memory cache with default settings.
    pub fn new() -> Self {
        Self::with_store(MemoryStore::new())
    }

    /// Returns a builder for configuring the cache name, default TTL,
    /// caching predicate and store.
    pub fn builder() -> AsyncFetchCacheBuilder<V> {
        AsyncFetchCacheBuilder::new()
    }
}

impl<V> Default for AsyncFetchCache<V>
where
    V: Clone + Cacheable + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V, S> Clone for AsyncFetchCache<V, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V, S> AsyncFetchCache<V, S>
where
    V: Clone + Cacheable + Send + Sync + 'static,
    S: Store<V> + 'static,
{
    /// Creates a cache with default settings in front of `store`.
    pub fn with_store(store: S) -> Self {
        Self::with_config(CacheConfig::new(), store)
    }

    /// Creates a cache from an explicit configuration and store.
    pub fn with_config(config: CacheConfig<V>, store: S) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: CacheState::new(config, store),
                flights: DashMap::new(),
                next_flight: AtomicU64::new(0),
            }),
        }
    }

    /// Returns the cached value for `key`, or awaits `fetch` to produce it.
    ///
    /// # Behavior
    ///
    /// 1. The access counter for `key` is incremented.
    /// 2. A fresh cached value is returned without awaiting anything.
    /// 3. Otherwise, if a fetch for `key` is in flight, this call awaits it
    ///    and returns the same result, success or failure.
    /// 4. Otherwise `fetch` is called to create the fetch future, which is
    ///    registered as the key's in-flight fetch and awaited. A cacheable
    ///    value is stored for `ttl` (unless `ttl` is zero) before it is handed
    ///    to this caller and every caller that joined in step 3.
    ///
    /// # Errors
    ///
    /// - [`CacheError::InvalidArgument`] for an empty key; nothing is counted.
    /// - [`CacheError::Fetch`] wrapping the error the fetch future produced.
    /// - [`CacheError::Abandoned`] if the fetch future panicked.
    pub async fn get_or_fetch<F, Fut, E>(
        &self,
        key: &str,
        ttl: Duration,
        fetch: F,
    ) -> CacheResult<V>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
        E: Into<Box<dyn StdError + Send + Sync + 'static>> + 'static,
    {
        if let Lookup::Hit(value) = self.inner.state.begin(key)? {
            return Ok(value);
        }

        let flight = match self.claim(key, ttl, fetch) {
            Claim::Ready(value) => {
                self.inner.state.record_join(key);
                return Ok(value);
            }
            Claim::Joined(flight) => {
                self.inner.state.record_join(key);
                flight
            }
            Claim::Leader(flight) => {
                self.inner.state.record_fetch(key, ttl);
                flight
            }
        };

        flight.await
    }

    /// [`get_or_fetch`](Self::get_or_fetch) with the configured default TTL.
    pub async fn get_or_fetch_default<F, Fut, E>(&self, key: &str, fetch: F) -> CacheResult<V>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
        E: Into<Box<dyn StdError + Send + Sync + 'static>> + 'static,
    {
        let ttl = self.inner.state.config().ttl();
        self.get_or_fetch(key, ttl, fetch).await
    }

    /// Number of `get_or_fetch` calls made for `key`, 0 if none.
    pub fn access_count(&self, key: &str) -> u64 {
        self.inner.state.access_count(key)
    }

    /// The fresh cached value for `key`, without counting or fetching.
    pub fn peek(&self, key: &str) -> Option<V> {
        self.inner.state.peek(key)
    }

    /// Drops the cached value for `key`. The access count is kept.
    pub fn invalidate(&self, key: &str) -> bool {
        self.inner.state.invalidate(key)
    }

    /// Drops every cached value. Access counts are kept.
    pub fn clear(&self) {
        self.inner.state.clear()
    }

    /// Removes expired values, returning how many were dropped.
    pub fn purge_expired(&self) -> usize {
        self.inner.state.purge_expired()
    }

    /// Stored values, including expired ones that have not been purged yet.
    pub fn len(&self) -> usize {
        self.inner.state.len()
    }

    /// Returns true if no values are stored.
    pub fn is_empty(&self) -> bool {
        self.inner.state.is_empty()
    }

    /// Number of fetches registered and not yet finished.
    pub fn in_flight(&self) -> usize {
        self.inner.flights.len()
    }

    /// The cache name used in log events and sweeper thread names.
    pub fn name(&self) -> &str {
        self.inner.state.name()
    }

    /// The backing store, shared by every clone of this handle.
    pub fn store(&self) -> &S {
        self.inner.state.store()
    }

    /// Hit, miss, join and fetch counters, shared by every clone.
    #[cfg(feature = "stats")]
    pub fn stats(&self) -> &CacheStats {
        self.inner.state.stats()
    }

    /// Starts a background thread purging expired values every `interval`.
    pub fn spawn_sweeper(&self, interval: Duration) -> CacheResult<Sweeper> {
        Sweeper::spawn::<V, S>(self.inner.state.store(), interval, self.inner.state.name())
    }

    fn claim<F, Fut, E>(&self, key: &str, ttl: Duration, fetch: F) -> Claim<V>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
        E: Into<Box<dyn StdError + Send + Sync + 'static>> + 'static,
    {
        match self.inner.flights.entry(key.to_string()) {
            Entry::Occupied(occupied) => Claim::Joined(occupied.get().fetch.clone()),
            Entry::Vacant(vacant) => {
                if let Some(value) = self.inner.state.recheck(key) {
                    return Claim::Ready(value);
                }
                let id = self.inner.next_flight.fetch_add(1, Ordering::Relaxed);
                let fetch = lead(
                    Arc::downgrade(&self.inner),
                    key.to_string(),
                    ttl,
                    id,
                    fetch,
                );
                vacant.insert(Flight {
                    id,
                    fetch: fetch.clone(),
                });
                Claim::Leader(fetch)
            }
        }
    }
}

/// Builds the shared fetch future for one flight.
///
/// `fetch` is not called until the future is first polled, so no user code
/// runs while the in-flight table is locked. The future only holds a weak
/// reference to the cache: a flight that outlives its cache still resolves,
/// it just has nowhere to store the value.
fn lead<V, S, F, Fut, E>(
    cache: Weak<Inner<V, S>>,
    key: String,
    ttl: Duration,
    id: u64,
    fetch: F,
) -> SharedFetch<V>
where
    V: Clone + Cacheable + Send + Sync + 'static,
    S: Store<V> + 'static,
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<V, E>> + Send + 'static,
    E: Into<Box<dyn StdError + Send + Sync + 'static>> + 'static,
{
    async move {
        let outcome = match AssertUnwindSafe(async move { fetch().await })
            .catch_unwind()
            .await
        {
            Ok(result) => result.map_err(|err| CacheError::fetch(&key, err)),
            Err(_) => {
                warn!(key = %key, "fetch panicked, releasing waiters");
                Err(CacheError::Abandoned { key: key.clone() })
            }
        };

        if let Some(inner) = cache.upgrade() {
            inner.state.settle(&key, ttl, &outcome);
            inner.flights.remove_if(&key, |_, flight| flight.id == id);
        }
        outcome
    }
    .boxed()
    .shared()
}

impl<V, S> fmt::Debug for AsyncFetchCache<V, S>
where
    V: Clone + Cacheable,
    S: Store<V>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncFetchCache")
            .field("name", &self.inner.state.name())
            .field("entries", &self.inner.state.len())
            .field("in_flight", &self.inner.flights.len())
            .finish()
    }
}

/// Builder for [`AsyncFetchCache`].
///
/// # Examples
///
/// ```
/// use fetchcache_async::AsyncFetchCache;
/// use std::time::Duration;
///
/// let cache = AsyncFetchCache::<String>::builder()
///     .name("pages")
///     .default_ttl(Duration::from_secs(30))
///     .build();
///
/// assert_eq!(cache.name(), "pages");
/// ```
pub struct AsyncFetchCacheBuilder<V, S = MemoryStore<V>> {
    config: CacheConfig<V>,
    store: S,
}

impl<V> AsyncFetchCacheBuilder<V> {
    /// Creates a builder with default settings and an in-memory store.
    pub fn new() -> Self {
        Self {
            config: CacheConfig::new(),
            store: MemoryStore::new(),
        }
    }
}

impl<V> Default for AsyncFetchCacheBuilder<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V, S> AsyncFetchCacheBuilder<V, S> {
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
    pub fn store<S2>(self, store: S2) -> AsyncFetchCacheBuilder<V, S2> {
        AsyncFetchCacheBuilder {
            config: self.config,
            store,
        }
    }

    /// Builds the cache. Clone the result to share it between tasks.
    pub fn build(self) -> AsyncFetchCache<V, S>
    where
        V: Clone + Cacheable + Send + Sync + 'static,
        S: Store<V> + 'static,
    {
        AsyncFetchCache::with_config(self.config, self.store)
    }
}
