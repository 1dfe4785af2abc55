//! # Fetchcache Core
//!
//! Building blocks for caching the results of remote fetches.
//!
//! A fetch cache sits in front of an idempotent, fallible operation such as
//! downloading a web page. It keeps each result for a time-to-live, counts
//! how often every key is requested, and makes sure that concurrent misses
//! on one key share a single fetch.
//!
//! ## Features
//!
//! - **TTL expiry**: a value is served only while `now < expires_at`
//! - **Access counting**: one increment per call, hit, miss or failure
//! - **Single flight**: at most one fetch per key; other callers join it
//! - **No poisoning**: failed and empty results are never stored
//! - **Pluggable storage**: values and counters live behind the [`Store`] trait
//! - **Background sweeping**: optional thread dropping expired entries
//! - **Statistics**: hit/miss/join counters with the `stats` feature
//!
//! ## Module Organization
//!
//! - [`cache_entry`] - Value wrapper with its expiry instant
//! - [`store`] - The [`Store`] trait and the in-memory [`MemoryStore`]
//! - [`utils`] - Argument validation helpers
//! - `fetch_cache` - The blocking [`FetchCache`]
//! - `state` - Logic shared by the blocking and async caches
//!
mod cacheable;
mod config;
mod error;
mod fetch_cache;
mod flight;
mod state;
mod sweeper;

pub mod cache_entry;
pub mod store;
pub mod utils;

#[cfg(feature = "stats")]
mod stats;

pub use cache_entry::CacheEntry;
pub use cacheable::Cacheable;
pub use config::{CacheConfig, CachePredicate, DEFAULT_NAME, DEFAULT_TTL};
pub use error::{CacheError, CacheResult, FetchSource};
pub use fetch_cache::{FetchCache, FetchCacheBuilder};
pub use state::{CacheState, Lookup};
pub use store::{MemoryStore, Store};
pub use sweeper::Sweeper;

#[cfg(feature = "stats")]
pub use stats::CacheStats;
