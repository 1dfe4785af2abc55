//! Example: caching page downloads and tracking how often each page is asked for.
//!
//! The "download" is simulated with a sleep. Run with
//! `RUST_LOG=fetchcache_core=debug cargo run --example page_tracker` to see
//! the cache's own log events.

use fetchcache::FetchCache;
use std::io;
use std::thread;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// Pretend to download a page; `/missing` fails.
fn download(url: &str) -> Result<String, io::Error> {
    println!("  [FETCH] downloading {}", url);
    thread::sleep(Duration::from_millis(200));
    if url.ends_with("/missing") {
        return Err(io::Error::new(io::ErrorKind::NotFound, "404 Not Found"));
    }
    Ok(format!("<html><body>{}</body></html>", url))
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Page Tracker Demo ===\n");

    let pages = FetchCache::<String>::builder()
        .name("pages")
        .default_ttl(Duration::from_millis(500))
        .build();

    let urls = [
        "https://example.com/",
        "https://example.com/about",
        "https://example.com/",
        "https://example.com/missing",
        "https://example.com/",
        "https://example.com/missing",
    ];

    for url in urls {
        let start = Instant::now();
        match pages.get_or_fetch_default(url, || download(url)) {
            Ok(body) => println!("  {} -> {} bytes in {:?}", url, body.len(), start.elapsed()),
            Err(err) => println!("  {} -> error: {}", url, err),
        }
    }

    println!("\nWaiting for entries to expire...");
    thread::sleep(Duration::from_millis(600));
    let body = pages
        .get_or_fetch_default(urls[0], || download(urls[0]))
        .map(|body| body.len());
    println!("  {} -> {:?}", urls[0], body);

    println!("\nAccess counts:");
    for url in ["https://example.com/", "https://example.com/about", "https://example.com/missing"] {
        println!("  {:<32} {}", url, pages.access_count(url));
    }

    let stats = pages.stats();
    println!("\nStatistics:");
    println!("  hits:     {}", stats.hits());
    println!("  misses:   {}", stats.misses());
    println!("  fetches:  {}", stats.fetches());
    println!("  failures: {}", stats.failures());
    println!("  hit rate: {:.1}%", stats.hit_rate() * 100.0);
}
