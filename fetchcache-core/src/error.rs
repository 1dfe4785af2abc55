//! Error types returned by fetch caches.

use std::error::Error as StdError;
use std::sync::Arc;
use thiserror::Error;

/// Boxed cause of a failed fetch, shared between every joined caller.
pub type FetchSource = Arc<dyn StdError + Send + Sync + 'static>;

/// Result alias used across the crate.
pub type CacheResult<T> = Result<T, CacheError>;

/// Errors surfaced by [`FetchCache`](crate::FetchCache) and its async sibling.
///
/// `CacheError` is `Clone` so that a single fetch failure can be handed to the
/// caller that ran the fetch and to every caller that joined it. Clones share
/// the same underlying cause.
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    #[error("invalid {argument}: {reason}")]
    InvalidArgument {
        argument: &'static str,
        reason: String,
    },

    #[error("fetch for `{key}` failed: {source}")]
    Fetch {
        key: String,
        #[source]
        source: FetchSource,
    },

    #[error("fetch for `{key}` was abandoned before it produced a result")]
    Abandoned { key: String },

    #[error("failed to start sweeper thread: {source}")]
    SweeperSpawn {
        #[source]
        source: Arc<std::io::Error>,
    },
}

impl CacheError {
    /// Wraps the error returned by a fetch closure.
    pub fn fetch<E>(key: &str, err: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync + 'static>>,
    {
        CacheError::Fetch {
            key: key.to_string(),
            source: Arc::from(err.into()),
        }
    }

    pub(crate) fn invalid(argument: &'static str, reason: impl Into<String>) -> Self {
        CacheError::InvalidArgument {
            argument,
            reason: reason.into(),
        }
    }

    /// Returns true for errors caused by the fetch itself.
    pub fn is_fetch(&self) -> bool {
        matches!(self, CacheError::Fetch { .. })
    }

    /// The key the failed operation was for, if it got that far.
    pub fn key(&self) -> Option<&str> {
        match self {
            CacheError::Fetch { key, .. } | CacheError::Abandoned { key } => Some(key),
            CacheError::InvalidArgument { .. } | CacheError::SweeperSpawn { .. } => None,
        }
    }

    /// The shared cause of a fetch failure.
    ///
    /// ```
    /// use fetchcache_core::CacheError;
    /// use std::io;
    ///
    /// let err = CacheError::fetch("https://example.com", io::Error::new(io::ErrorKind::Other, "reset"));
    /// let cause = err.fetch_source().unwrap();
    /// assert!(cause.downcast_ref::<io::Error>().is_some());
    /// ```
    pub fn fetch_source(&self) -> Option<&FetchSource> {
        match self {
            CacheError::Fetch { source, .. } => Some(source),
            _ => None,
        }
    }
}
