//! Example: many threads asking for the same slow page at once.
//!
//! Only one download happens; every other thread waits for it and receives
//! the same body.

use fetchcache::FetchCache;
use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Barrier;
use std::thread;
use std::time::{Duration, Instant};
use tracing::info;
use tracing_subscriber::EnvFilter;

const THREADS: usize = 8;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_thread_names(true)
        .init();

    let pages: FetchCache<String> = FetchCache::new();
    let downloads = AtomicUsize::new(0);
    let barrier = Barrier::new(THREADS);
    let start = Instant::now();

    thread::scope(|s| {
        for i in 0..THREADS {
            let (pages, downloads, barrier) = (&pages, &downloads, &barrier);
            thread::Builder::new()
                .name(format!("worker-{}", i))
                .spawn_scoped(s, move || {
                    barrier.wait();
                    let body = pages
                        .get_or_fetch("https://example.com/slow", Duration::from_secs(5), || {
                            downloads.fetch_add(1, Ordering::SeqCst);
                            thread::sleep(Duration::from_millis(300));
                            Ok::<_, Infallible>("<html>slow page</html>".to_string())
                        })
                        .unwrap_or_default();
                    info!(bytes = body.len(), "got page");
                })
                .expect("failed to spawn worker");
        }
    });

    println!("\n{} threads served in {:?}", THREADS, start.elapsed());
    println!("downloads:    {}", downloads.load(Ordering::SeqCst));
    println!("access count: {}", pages.access_count("https://example.com/slow"));
}
