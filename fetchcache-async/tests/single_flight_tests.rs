// Tests for at-most-one-fetch-per-key behavior of AsyncFetchCache
//
// Concurrent callers that miss on the same key must share one fetch and all
// receive its result, whether it succeeds or fails.

use fetchcache_async::{AsyncFetchCache, CacheError};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Barrier;

const TTL: Duration = Duration::from_secs(10);

fn slow_fetch(
    calls: Arc<AtomicUsize>,
    body: &'static str,
) -> impl FnOnce() -> futures::future::BoxFuture<'static, Result<String, io::Error>> {
    use futures::FutureExt;
    move || {
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok(body.to_string())
        }
        .boxed()
    }
}

#[tokio::test]
async fn test_two_simultaneous_callers_share_one_fetch() {
    let cache: AsyncFetchCache<String> = AsyncFetchCache::new();
    let calls = Arc::new(AtomicUsize::new(0));

    let (first, second) = tokio::join!(
        cache.get_or_fetch("b", TTL, slow_fetch(Arc::clone(&calls), "page-b")),
        cache.get_or_fetch("b", TTL, slow_fetch(Arc::clone(&calls), "page-b")),
    );

    assert_eq!(first.unwrap(), "page-b");
    assert_eq!(second.unwrap(), "page-b");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.access_count("b"), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_tasks_share_one_fetch() {
    let cache: AsyncFetchCache<String> = AsyncFetchCache::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(Barrier::new(16));

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let cache = cache.clone();
            let calls = Arc::clone(&calls);
            let barrier = Arc::clone(&barrier);
            tokio::spawn(async move {
                barrier.wait().await;
                cache
                    .get_or_fetch("hot", TTL, slow_fetch(calls, "shared"))
                    .await
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), "shared");
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.access_count("hot"), 16);
    assert_eq!(cache.in_flight(), 0);

    #[cfg(feature = "stats")]
    {
        let stats = cache.stats();
        assert_eq!(stats.fetches(), 1);
        // Stragglers scheduled after the fetch landed count as hits.
        assert_eq!(stats.hits() + stats.joins(), 15);
    }
}

#[tokio::test]
async fn test_distinct_keys_fetch_independently() {
    let cache: AsyncFetchCache<String> = AsyncFetchCache::new();
    let calls = Arc::new(AtomicUsize::new(0));

    let (a, b) = tokio::join!(
        cache.get_or_fetch("a", TTL, slow_fetch(Arc::clone(&calls), "A")),
        cache.get_or_fetch("b", TTL, slow_fetch(Arc::clone(&calls), "B")),
    );

    assert_eq!(a.unwrap(), "A");
    assert_eq!(b.unwrap(), "B");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_failure_reaches_every_joined_caller() {
    let cache: AsyncFetchCache<String> = AsyncFetchCache::new();
    let calls = Arc::new(AtomicUsize::new(0));

    let failing = |calls: Arc<AtomicUsize>| {
        move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            Err::<String, _>(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"))
        }
    };

    let (first, second, third) = tokio::join!(
        cache.get_or_fetch("down", TTL, failing(Arc::clone(&calls))),
        cache.get_or_fetch("down", TTL, failing(Arc::clone(&calls))),
        cache.get_or_fetch("down", TTL, failing(Arc::clone(&calls))),
    );
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let errors = [first.unwrap_err(), second.unwrap_err(), third.unwrap_err()];
    let cause = errors[0].fetch_source().unwrap();
    for err in &errors {
        assert!(matches!(err, CacheError::Fetch { key, .. } if key == "down"));
        assert!(Arc::ptr_eq(err.fetch_source().unwrap(), cause));
    }
    assert_eq!(
        cause.downcast_ref::<io::Error>().unwrap().kind(),
        io::ErrorKind::ConnectionRefused
    );

    // Nothing was cached: the next call fetches again.
    assert!(cache.is_empty());
    let recovered = cache
        .get_or_fetch("down", TTL, slow_fetch(Arc::clone(&calls), "back up"))
        .await
        .unwrap();
    assert_eq!(recovered, "back up");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(cache.access_count("down"), 4);
}

#[tokio::test]
async fn test_empty_result_is_shared_but_not_cached() {
    let cache: AsyncFetchCache<String> = AsyncFetchCache::new();
    let calls = Arc::new(AtomicUsize::new(0));

    let (first, second) = tokio::join!(
        cache.get_or_fetch("empty", TTL, slow_fetch(Arc::clone(&calls), "")),
        cache.get_or_fetch("empty", TTL, slow_fetch(Arc::clone(&calls), "")),
    );
    assert_eq!(first.unwrap(), "");
    assert_eq!(second.unwrap(), "");
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    cache
        .get_or_fetch("empty", TTL, slow_fetch(Arc::clone(&calls), ""))
        .await
        .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_empty_key_rejected() {
    let cache: AsyncFetchCache<String> = AsyncFetchCache::new();
    let calls = Arc::new(AtomicUsize::new(0));

    let result = cache
        .get_or_fetch("", TTL, slow_fetch(Arc::clone(&calls), "x"))
        .await;

    assert!(matches!(result, Err(CacheError::InvalidArgument { .. })));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(cache.access_count(""), 0);
}
