//! # Fetchcache Async
//!
//! Expiring, access-counting cache for `async` fetch operations.
//!
//! This crate provides [`AsyncFetchCache`], the async counterpart of
//! `fetchcache_core::FetchCache`. It keeps values in the same
//! [`Store`](fetchcache_core::Store) implementations and follows the same
//! rules; the difference is that callers waiting on an in-flight fetch
//! suspend instead of blocking a thread.
//!
//! ## Features
//!
//! - **Single flight**: concurrent misses on one key share one fetch future
//! - **Cancellation safe**: dropping a waiting caller never cancels the fetch for others
//! - **Runtime agnostic**: no dependency on a specific executor
//! - **No await on the fast path**: hits, counting and storage are synchronous
//! - **Statistics**: hit/miss/join counters with the `stats` feature
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! fetchcache-async = "0.1"
//! tokio = { version = "1", features = ["full"] }
//! ```
//!
//! ## Examples
//!
//! ### Caching a page fetch
//!
//! ```rust,ignore
//! use fetchcache_async::AsyncFetchCache;
//! use std::time::Duration;
//!
//! let pages: AsyncFetchCache<String> = AsyncFetchCache::new();
//!
//! let url = "https://example.com".to_string();
//! let body = pages
//!     .get_or_fetch(&url.clone(), Duration::from_secs(10), move || async move {
//!         reqwest::get(&url).await?.text().await
//!     })
//!     .await?;
//!
//! println!("{} was requested {} times", url, pages.access_count(&url));
//! ```
//!
//! ### Waiting with a deadline
//!
//! ```rust,ignore
//! // Giving up does not cancel the fetch for anyone else waiting on it.
//! let body = tokio::time::timeout(
//!     Duration::from_secs(2),
//!     pages.get_or_fetch(&url, ttl, fetch),
//! )
//! .await;
//! ```
//!
//! ## Thread Safety
//!
//! `AsyncFetchCache` is `Clone`, `Send` and `Sync`; clones share one cache.
//! Every internal map is a [`DashMap`](https://docs.rs/dashmap), so keys
//! only contend when they land in the same shard.
//!

mod async_fetch_cache;

pub use async_fetch_cache::{AsyncFetchCache, AsyncFetchCacheBuilder};

// Re-export the shared building blocks from fetchcache-core
pub use fetchcache_core::{
    utils, CacheConfig, CacheError, CacheResult, Cacheable, MemoryStore, Store, Sweeper,
};

#[cfg(feature = "stats")]
pub use fetchcache_core::CacheStats;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{AsyncFetchCache, CacheError, CacheResult, Cacheable};
}
