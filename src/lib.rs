//! # Fetchcache
//!
//! An expiring cache for the results of slow, fallible fetches, with a
//! per-key access counter and single-flight deduplication.
//!
//! ## Features
//!
//! - **TTL expiry**: each value is served until its time-to-live elapses
//! - **Access counting**: every call is counted, whether it hits, misses or fails
//! - **Single flight**: concurrent misses on one key share one fetch
//! - **No poisoning**: failed and empty results are never cached
//! - **Pluggable storage**: implement [`Store`] to keep values elsewhere
//! - **Async support**: `AsyncFetchCache` with the `async` feature
//!
//! ## Quick Start
//!
//! ```rust
//! use fetchcache::FetchCache;
//! use std::convert::Infallible;
//! use std::time::Duration;
//!
//! let pages: FetchCache<String> = FetchCache::new();
//!
//! let body = pages
//!     .get_or_fetch("https://example.com", Duration::from_secs(10), || {
//!         Ok::<_, Infallible>("<html>hello</html>".to_string())
//!     })
//!     .unwrap();
//! assert_eq!(body, "<html>hello</html>");
//!
//! // Served from the cache; the closure is not called again.
//! let again = pages
//!     .get_or_fetch("https://example.com", Duration::from_secs(10), || -> Result<String, Infallible> {
//!         unreachable!("served from the cache")
//!     })
//!     .unwrap();
//! assert_eq!(again, body);
//! assert_eq!(pages.access_count("https://example.com"), 2);
//! ```
//!
//! ## Failures
//!
//! A failed fetch reaches the caller, and every caller that joined it, as
//! [`CacheError::Fetch`]. Nothing is stored, so the next call tries again.
//!
//! ```rust
//! use fetchcache::{CacheError, FetchCache};
//! use std::io;
//! use std::time::Duration;
//!
//! let pages: FetchCache<String> = FetchCache::new();
//! let err = pages
//!     .get_or_fetch("https://down.example", Duration::from_secs(10), || {
//!         Err(io::Error::new(io::ErrorKind::TimedOut, "timed out"))
//!     })
//!     .unwrap_err();
//!
//! assert!(matches!(err, CacheError::Fetch { .. }));
//! assert!(pages.peek("https://down.example").is_none());
//! ```
//!
//! ## Configuration
//!
//! ```rust
//! use fetchcache::FetchCache;
//! use std::time::Duration;
//!
//! let pages = FetchCache::<String>::builder()
//!     .name("pages")
//!     .default_ttl(Duration::from_secs(30))
//!     .cache_if(|body: &String| !body.contains("maintenance"))
//!     .build();
//! assert_eq!(pages.name(), "pages");
//! ```
//!
//! ## Logging
//!
//! Cache activity is reported through [`tracing`](https://docs.rs/tracing)
//! events carrying the cache name and key. Install any subscriber to see them.
//!

pub use fetchcache_core::{
    cache_entry, store, utils, CacheConfig, CacheEntry, CacheError, CachePredicate, CacheResult,
    Cacheable, FetchCache, FetchCacheBuilder, FetchSource, MemoryStore, Store, Sweeper,
    DEFAULT_NAME, DEFAULT_TTL,
};

#[cfg(feature = "stats")]
pub use fetchcache_core::CacheStats;

#[cfg(feature = "async")]
pub use fetchcache_async::{AsyncFetchCache, AsyncFetchCacheBuilder};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{CacheError, CacheResult, Cacheable, FetchCache, Store};

    #[cfg(feature = "async")]
    pub use crate::AsyncFetchCache;
}
