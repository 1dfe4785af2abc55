use crate::error::{CacheError, CacheResult};
use std::time::Duration;

/// Rejects keys a cache cannot address.
///
/// # Errors
///
/// [`CacheError::InvalidArgument`] for an empty key.
///
/// # Examples
///
/// ```
/// use fetchcache_core::utils::validate_key;
///
/// assert!(validate_key("https://example.com").is_ok());
/// assert!(validate_key("").is_err());
/// ```
pub fn validate_key(key: &str) -> CacheResult<()> {
    if key.is_empty() {
        return Err(CacheError::invalid("key", "must not be empty"));
    }
    Ok(())
}

/// Converts a signed number of seconds into a TTL.
///
/// Useful when the TTL comes from a loosely typed source such as a config
/// value. Zero is accepted and means "never cache".
///
/// # Errors
///
/// [`CacheError::InvalidArgument`] for a negative value.
///
/// # Examples
///
/// ```
/// use fetchcache_core::utils::ttl_from_secs;
/// use std::time::Duration;
///
/// assert_eq!(ttl_from_secs(10).unwrap(), Duration::from_secs(10));
/// assert_eq!(ttl_from_secs(0).unwrap(), Duration::ZERO);
/// assert!(ttl_from_secs(-1).is_err());
/// ```
pub fn ttl_from_secs(secs: i64) -> CacheResult<Duration> {
    u64::try_from(secs)
        .map(Duration::from_secs)
        .map_err(|_| CacheError::invalid("ttl", format!("{secs}s is negative")))
}

/// Milliseconds in `ttl`, saturated to `u64`, for log fields.
pub(crate) fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX)
}
