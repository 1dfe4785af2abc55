use crate::Cacheable;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// TTL used by `get_or_fetch_default` unless configured otherwise.
pub const DEFAULT_TTL: Duration = Duration::from_secs(10);

/// Label attached to log events unless configured otherwise.
pub const DEFAULT_NAME: &str = "fetchcache";

/// Predicate deciding whether a fetched value is stored.
pub type CachePredicate<V> = Arc<dyn Fn(&V) -> bool + Send + Sync>;

/// Settings shared by every cache flavour.
///
/// None of the settings is required; `CacheConfig::default()` gives a cache
/// named `"fetchcache"` with a 10 second default TTL that refuses to store
/// empty values.
///
/// # Examples
///
/// ```
/// use fetchcache_core::CacheConfig;
/// use std::time::Duration;
///
/// let config: CacheConfig<String> = CacheConfig::new()
///     .name("pages")
///     .default_ttl(Duration::from_secs(30))
///     .cache_if(|body: &String| body.starts_with("<!doctype"));
///
/// assert_eq!(config.cache_name(), "pages");
/// assert!(!config.should_cache(&"oops".to_string()));
/// ```
pub struct CacheConfig<V> {
    name: String,
    default_ttl: Duration,
    cache_if: Option<CachePredicate<V>>,
}

impl<V> CacheConfig<V> {
    pub fn new() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            default_ttl: DEFAULT_TTL,
            cache_if: None,
        }
    }

    /// Sets the label used in log events.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the TTL used by `get_or_fetch_default`.
    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Replaces the [`Cacheable`] check with a custom predicate.
    pub fn cache_if<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&V) -> bool + Send + Sync + 'static,
    {
        self.cache_if = Some(Arc::new(predicate));
        self
    }

    pub fn cache_name(&self) -> &str {
        &self.name
    }

    pub fn ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Whether a successfully fetched `value` may be stored.
    pub fn should_cache(&self, value: &V) -> bool
    where
        V: Cacheable,
    {
        match &self.cache_if {
            Some(predicate) => predicate(value),
            None => value.is_cacheable(),
        }
    }
}

impl<V> Default for CacheConfig<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Clone for CacheConfig<V> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            default_ttl: self.default_ttl,
            cache_if: self.cache_if.clone(),
        }
    }
}

impl<V> fmt::Debug for CacheConfig<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheConfig")
            .field("name", &self.name)
            .field("default_ttl", &self.default_ttl)
            .field("cache_if", &self.cache_if.as_ref().map(|_| "<predicate>"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: CacheConfig<String> = CacheConfig::default();
        assert_eq!(config.cache_name(), DEFAULT_NAME);
        assert_eq!(config.ttl(), Duration::from_secs(10));
        assert!(config.should_cache(&"x".to_string()));
        assert!(!config.should_cache(&String::new()));
    }

    #[test]
    fn test_predicate_overrides_cacheable() {
        // Accept empty bodies, reject error pages.
        let config: CacheConfig<String> =
            CacheConfig::new().cache_if(|body: &String| !body.starts_with("ERR"));

        assert!(config.should_cache(&String::new()));
        assert!(!config.should_cache(&"ERR 500".to_string()));
    }

    #[test]
    fn test_debug_hides_predicate() {
        let config: CacheConfig<u32> = CacheConfig::new().name("ids").cache_if(|v| *v > 0);
        let debug = format!("{config:?}");
        assert!(debug.contains("ids"));
        assert!(debug.contains("<predicate>"));
    }

    #[test]
    fn test_clone_shares_predicate() {
        let config: CacheConfig<u32> = CacheConfig::new().cache_if(|v| *v % 2 == 0);
        let cloned = config.clone();
        assert!(cloned.should_cache(&4));
        assert!(!cloned.should_cache(&3));
    }
}
