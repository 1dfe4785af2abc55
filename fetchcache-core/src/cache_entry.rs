use std::time::{Duration, Instant};

/// A cached value together with the instant it stops being visible.
///
/// Entries are immutable once created: a refreshed value replaces the whole
/// entry instead of updating it in place.
///
/// # Type Parameters
///
/// * `V` - The type of the cached value
///
/// # Fields
///
/// * `value` - The cached value
/// * `inserted_at` - The `Instant` when this entry was created
/// * `expires_at` - The first `Instant` at which the entry is stale
///
/// # Examples
///
/// ```
/// use fetchcache_core::CacheEntry;
/// use std::time::Duration;
///
/// let entry = CacheEntry::new("<html>", Duration::from_secs(10));
/// assert_eq!(entry.value, "<html>");
/// assert!(entry.is_fresh());
/// ```
#[derive(Clone, Debug)]
pub struct CacheEntry<V> {
    pub value: V,
    pub inserted_at: Instant,
    pub expires_at: Instant,
}

impl<V> CacheEntry<V> {
    /// Creates an entry that stays fresh for `ttl` starting now.
    ///
    /// A `ttl` too large to represent as an `Instant` saturates to roughly
    /// one hundred years, which is effectively "never expires".
    pub fn new(value: V, ttl: Duration) -> Self {
        let now = Instant::now();
        Self::with_expiry(value, now, expiry_after(now, ttl))
    }

    /// Creates an entry with explicit timestamps.
    pub fn with_expiry(value: V, inserted_at: Instant, expires_at: Instant) -> Self {
        Self {
            value,
            inserted_at,
            expires_at,
        }
    }

    /// Returns true if the entry is visible at `now`, i.e. `now < expires_at`.
    #[inline]
    pub fn is_fresh_at(&self, now: Instant) -> bool {
        now < self.expires_at
    }

    /// Returns true if the entry is visible right now.
    ///
    /// # Examples
    ///
    /// ```
    /// use fetchcache_core::CacheEntry;
    /// use std::thread;
    /// use std::time::Duration;
    ///
    /// let entry = CacheEntry::new("data", Duration::from_millis(50));
    /// assert!(entry.is_fresh());
    ///
    /// thread::sleep(Duration::from_millis(60));
    /// assert!(entry.is_expired());
    /// ```
    #[inline]
    pub fn is_fresh(&self) -> bool {
        self.is_fresh_at(Instant::now())
    }

    #[inline]
    pub fn is_expired(&self) -> bool {
        !self.is_fresh()
    }

    /// Time elapsed since the entry was created.
    pub fn age(&self) -> Duration {
        self.inserted_at.elapsed()
    }

    /// Time left before the entry goes stale, zero once expired.
    pub fn remaining_ttl(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }
}

/// Computes `now + ttl`, saturating instead of panicking on overflow.
pub(crate) fn expiry_after(now: Instant, ttl: Duration) -> Instant {
    const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

    now.checked_add(ttl)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}
