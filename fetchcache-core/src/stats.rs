use std::sync::atomic::{AtomicU64, Ordering};

/// Counters describing how a fetch cache resolved its calls.
///
/// Every `get_or_fetch` call lands in exactly one of `hits`, `joins` or
/// `fetches` (a call that found no fresh value is also counted in `misses`).
/// `failures` and `uncacheable` refine `fetches`.
///
/// All counters use `Relaxed` atomics: they are monotonic tallies and never
/// synchronize other memory.
///
/// # Examples
///
/// ```
/// use fetchcache_core::CacheStats;
///
/// let stats = CacheStats::new();
/// stats.record_hit();
/// stats.record_hit();
/// stats.record_miss();
/// stats.record_fetch();
///
/// assert_eq!(stats.hits(), 2);
/// assert_eq!(stats.misses(), 1);
/// assert_eq!(stats.total_accesses(), 3);
/// assert!((stats.hit_rate() - 0.6666).abs() < 0.001);
/// ```
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    joins: AtomicU64,
    fetches: AtomicU64,
    failures: AtomicU64,
    uncacheable: AtomicU64,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh entry was served.
    #[inline]
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    /// No fresh entry was found.
    #[inline]
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// A miss attached to a fetch already in flight.
    #[inline]
    pub fn record_join(&self) {
        self.joins.fetch_add(1, Ordering::Relaxed);
    }

    /// A miss started a new fetch.
    #[inline]
    pub fn record_fetch(&self) {
        self.fetches.fetch_add(1, Ordering::Relaxed);
    }

    /// A fetch returned an error (or was abandoned).
    #[inline]
    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    /// A fetch succeeded but its value was rejected by the cache predicate.
    #[inline]
    pub fn record_uncacheable(&self) {
        self.uncacheable.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn joins(&self) -> u64 {
        self.joins.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn fetches(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn uncacheable(&self) -> u64 {
        self.uncacheable.load(Ordering::Relaxed)
    }

    /// Hits plus misses.
    #[inline]
    pub fn total_accesses(&self) -> u64 {
        self.hits() + self.misses()
    }

    /// Fraction of accesses served from cache (0.0 with no accesses).
    #[inline]
    pub fn hit_rate(&self) -> f64 {
        let total = self.total_accesses();
        if total == 0 {
            0.0
        } else {
            self.hits() as f64 / total as f64
        }
    }

    #[inline]
    pub fn miss_rate(&self) -> f64 {
        1.0 - self.hit_rate()
    }

    /// Fraction of misses that were absorbed by an in-flight fetch.
    pub fn dedup_rate(&self) -> f64 {
        let misses = self.misses();
        if misses == 0 {
            0.0
        } else {
            self.joins() as f64 / misses as f64
        }
    }

    /// Zeroes every counter. Access counts kept by the store are unaffected.
    pub fn reset(&self) {
        for counter in [
            &self.hits,
            &self.misses,
            &self.joins,
            &self.fetches,
            &self.failures,
            &self.uncacheable,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

impl Clone for CacheStats {
    fn clone(&self) -> Self {
        Self {
            hits: AtomicU64::new(self.hits()),
            misses: AtomicU64::new(self.misses()),
            joins: AtomicU64::new(self.joins()),
            fetches: AtomicU64::new(self.fetches()),
            failures: AtomicU64::new(self.failures()),
            uncacheable: AtomicU64::new(self.uncacheable()),
        }
    }
}
