use crate::error::{CacheError, CacheResult};
use crate::Store;
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::marker::PhantomData;
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, trace};

/// Handle to a background thread that purges expired entries.
///
/// Expired entries are otherwise only removed when a read stumbles on them,
/// so keys that are never read again would stay in memory. The sweeper calls
/// [`Store::purge_expired`] every `interval`.
///
/// The thread holds only a weak reference to the store: it exits on its own
/// once the owning cache is dropped. Dropping the handle stops it and waits
/// for it to finish.
///
/// # Examples
///
/// ```
/// use fetchcache_core::FetchCache;
/// use std::time::Duration;
///
/// let cache: FetchCache<String> = FetchCache::new();
/// let sweeper = cache.spawn_sweeper(Duration::from_secs(30)).unwrap();
/// // ...
/// sweeper.stop();
/// ```
pub struct Sweeper {
    shutdown: Arc<(Mutex<bool>, Condvar)>,
    handle: Option<JoinHandle<()>>,
}

impl Sweeper {
    /// Starts sweeping `store` every `interval`.
    ///
    /// # Errors
    ///
    /// - [`CacheError::InvalidArgument`] for a zero interval.
    /// - [`CacheError::SweeperSpawn`] if the OS refuses to create the thread.
    pub fn spawn<V, S>(store: &Arc<S>, interval: Duration, name: &str) -> CacheResult<Self>
    where
        V: 'static,
        S: Store<V> + 'static,
    {
        if interval.is_zero() {
            return Err(CacheError::invalid("sweep interval", "must be non-zero"));
        }

        let shutdown = Arc::new((Mutex::new(false), Condvar::new()));
        let worker = SweepLoop::<V, S> {
            store: Arc::downgrade(store),
            shutdown: Arc::clone(&shutdown),
            interval,
            name: name.to_string(),
            _value: PhantomData,
        };

        let handle = thread::Builder::new()
            .name(format!("{name}-sweeper"))
            .spawn(move || worker.run())
            .map_err(|err| CacheError::SweeperSpawn {
                source: Arc::new(err),
            })?;

        Ok(Self {
            shutdown,
            handle: Some(handle),
        })
    }

    /// Stops the thread and waits for it to exit.
    pub fn stop(mut self) {
        self.shutdown_and_join();
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    fn shutdown_and_join(&mut self) {
        let (stopped, wake) = &*self.shutdown;
        *stopped.lock() = true;
        wake.notify_all();

        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.shutdown_and_join();
    }
}

struct SweepLoop<V, S> {
    store: Weak<S>,
    shutdown: Arc<(Mutex<bool>, Condvar)>,
    interval: Duration,
    name: String,
    _value: PhantomData<fn() -> V>,
}

impl<V, S: Store<V>> SweepLoop<V, S> {
    fn run(self) {
        let (stopped, wake) = &*self.shutdown;
        let mut stopped = stopped.lock();
        debug!(cache = %self.name, interval_ms = self.interval.as_millis() as u64, "sweeper started");

        // The flag may be set before the first wait or while a sweep runs
        // unlocked, so it is checked before every wait.
        while !*stopped {
            if !wake.wait_for(&mut stopped, self.interval).timed_out() || *stopped {
                continue;
            }

            let Some(store) = self.store.upgrade() else {
                break;
            };
            let removed = MutexGuard::unlocked(&mut stopped, || store.purge_expired());
            trace!(cache = %self.name, removed, "sweep finished");
        }

        debug!(cache = %self.name, "sweeper stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use crate::MemoryStore;
    use std::time::Instant;

    #[test]
    fn test_zero_interval_rejected() {
        let store: Arc<MemoryStore<u8>> = Arc::new(MemoryStore::new());
        let result = Sweeper::spawn::<u8, _>(&store, Duration::ZERO, "t");
        assert!(matches!(result, Err(CacheError::InvalidArgument { .. })));
    }

    #[test]
    #[serial]
    fn test_sweeps_expired_entries() {
        let store: Arc<MemoryStore<u8>> = Arc::new(MemoryStore::new());
        store.set_ex("gone", 1, Duration::from_millis(20));
        store.set_ex("kept", 2, Duration::from_secs(60));

        let sweeper = Sweeper::spawn::<u8, _>(&store, Duration::from_millis(25), "t").unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        while store.len() > 1 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("kept"), Some(2));
        sweeper.stop();
    }

    #[test]
    #[serial]
    fn test_exits_when_store_dropped() {
        let store: Arc<MemoryStore<u8>> = Arc::new(MemoryStore::new());
        let sweeper = Sweeper::spawn::<u8, _>(&store, Duration::from_millis(10), "t").unwrap();
        assert!(sweeper.is_running());

        drop(store);
        let deadline = Instant::now() + Duration::from_secs(2);
        while sweeper.is_running() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        assert!(!sweeper.is_running());
    }

    #[test]
    fn test_stop_right_after_spawn_returns_promptly() {
        let store: Arc<MemoryStore<u8>> = Arc::new(MemoryStore::new());

        for _ in 0..20 {
            let sweeper = Sweeper::spawn::<u8, _>(&store, Duration::from_secs(5), "t").unwrap();
            let started = Instant::now();
            sweeper.stop();
            assert!(started.elapsed() < Duration::from_secs(1));
        }
    }

    #[test]
    #[serial]
    fn test_stop_during_sweeps_returns_promptly() {
        let store: Arc<MemoryStore<u8>> = Arc::new(MemoryStore::new());
        for i in 0..1_000u16 {
            store.set_ex(&format!("k{i}"), 0, Duration::from_millis(1));
        }

        let sweeper = Sweeper::spawn::<u8, _>(&store, Duration::from_millis(1), "t").unwrap();
        thread::sleep(Duration::from_millis(15));

        let started = Instant::now();
        sweeper.stop();
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_drop_stops_thread() {
        let store: Arc<MemoryStore<u8>> = Arc::new(MemoryStore::new());
        let sweeper = Sweeper::spawn::<u8, _>(&store, Duration::from_secs(3600), "t").unwrap();

        let started = Instant::now();
        drop(sweeper);
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
