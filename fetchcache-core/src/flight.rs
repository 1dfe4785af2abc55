use crate::error::{CacheError, CacheResult};
use dashmap::DashMap;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use tracing::warn;

/// A fetch in progress for one key, shared by its leader and all joiners.
///
/// Waiters block on a condition variable until the leader publishes a
/// result. The result is published exactly once.
#[derive(Debug)]
pub(crate) struct Flight<V> {
    result: Mutex<Option<CacheResult<V>>>,
    ready: Condvar,
}

impl<V: Clone> Flight<V> {
    pub(crate) fn new() -> Self {
        Self {
            result: Mutex::new(None),
            ready: Condvar::new(),
        }
    }

    /// Blocks until the leader publishes, then returns a copy of the result.
    pub(crate) fn wait(&self) -> CacheResult<V> {
        let mut slot = self.result.lock();
        loop {
            if let Some(result) = slot.as_ref() {
                return result.clone();
            }
            self.ready.wait(&mut slot);
        }
    }

    fn publish(&self, result: CacheResult<V>) {
        let mut slot = self.result.lock();
        if slot.is_none() {
            *slot = Some(result);
        }
        drop(slot);
        self.ready.notify_all();
    }
}

/// Ownership of an in-flight slot held by the caller running the fetch.
///
/// [`release`](FlightGuard::release) removes the marker and wakes every
/// joiner with the result. If the guard is dropped without being released
/// (the fetch panicked), joiners are woken with [`CacheError::Abandoned`]
/// so nobody waits forever and the key can be fetched again.
pub(crate) struct FlightGuard<'a, V: Clone> {
    flights: &'a DashMap<String, Arc<Flight<V>>>,
    key: &'a str,
    flight: Arc<Flight<V>>,
    released: bool,
}

impl<'a, V: Clone> FlightGuard<'a, V> {
    pub(crate) fn new(
        flights: &'a DashMap<String, Arc<Flight<V>>>,
        key: &'a str,
        flight: Arc<Flight<V>>,
    ) -> Self {
        Self {
            flights,
            key,
            flight,
            released: false,
        }
    }

    pub(crate) fn release(mut self, result: CacheResult<V>) {
        self.released = true;
        self.finish(result);
    }

    fn finish(&self, result: CacheResult<V>) {
        // Remove our own marker only; a later flight for the key is not ours.
        self.flights
            .remove_if(self.key, |_, flight| Arc::ptr_eq(flight, &self.flight));
        self.flight.publish(result);
    }
}

impl<V: Clone> Drop for FlightGuard<'_, V> {
    fn drop(&mut self) {
        if !self.released {
            warn!(key = self.key, "fetch abandoned, releasing waiters");
            self.finish(Err(CacheError::Abandoned {
                key: self.key.to_string(),
            }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    fn claim<'a>(
        flights: &'a DashMap<String, Arc<Flight<u32>>>,
        key: &'a str,
    ) -> FlightGuard<'a, u32> {
        let flight = Arc::new(Flight::new());
        flights.insert(key.to_string(), Arc::clone(&flight));
        FlightGuard::new(flights, key, flight)
    }

    #[test]
    fn test_release_wakes_waiters_and_removes_marker() {
        let flights = DashMap::new();
        let guard = claim(&flights, "k");
        let flight = Arc::clone(flights.get("k").unwrap().value());

        let waiter = thread::spawn(move || flight.wait());
        thread::sleep(Duration::from_millis(20));
        guard.release(Ok(7));

        assert_eq!(waiter.join().unwrap().unwrap(), 7);
        assert!(flights.is_empty());
    }

    #[test]
    fn test_wait_after_publish_returns_immediately() {
        let flights = DashMap::new();
        let guard = claim(&flights, "k");
        let flight = Arc::clone(flights.get("k").unwrap().value());

        guard.release(Err(CacheError::fetch("k", "boom")));
        assert!(flight.wait().unwrap_err().is_fetch());
        assert!(flight.wait().unwrap_err().is_fetch());
    }

    #[test]
    fn test_drop_without_release_abandons() {
        let flights = DashMap::new();
        let guard = claim(&flights, "k");
        let flight = Arc::clone(flights.get("k").unwrap().value());

        drop(guard);

        assert!(matches!(flight.wait(), Err(CacheError::Abandoned { .. })));
        assert!(flights.is_empty());
    }

    #[test]
    fn test_release_leaves_newer_marker_alone() {
        let flights = DashMap::new();
        let old = claim(&flights, "k");
        let newer = Arc::new(Flight::new());
        flights.insert("k".to_string(), Arc::clone(&newer));

        old.release(Ok(1));

        let current = flights.get("k").unwrap();
        assert!(Arc::ptr_eq(current.value(), &newer));
    }
}
