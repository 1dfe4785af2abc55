// Property tests: access counts and fetch decisions over arbitrary call sequences

use fetchcache::FetchCache;
use proptest::prelude::*;
use std::collections::{HashMap, HashSet};
use std::io;
use std::time::Duration;

const KEYS: [&str; 4] = ["a", "b", "c", "d"];

#[derive(Debug, Clone, Copy)]
enum Outcome {
    Body,
    Empty,
    Failure,
}

fn outcome() -> impl Strategy<Value = Outcome> {
    prop_oneof![
        Just(Outcome::Body),
        Just(Outcome::Empty),
        Just(Outcome::Failure),
    ]
}

proptest! {
    #[test]
    fn every_call_is_counted(calls in prop::collection::vec((0..KEYS.len(), outcome()), 0..64)) {
        let cache: FetchCache<String> = FetchCache::new();
        let mut expected: HashMap<&str, u64> = HashMap::new();

        for (index, outcome) in &calls {
            let key = KEYS[*index];
            let _ = cache.get_or_fetch(key, Duration::from_secs(60), || match outcome {
                Outcome::Body => Ok(format!("body of {key}")),
                Outcome::Empty => Ok(String::new()),
                Outcome::Failure => Err(io::Error::new(io::ErrorKind::Other, "down")),
            });
            *expected.entry(key).or_default() += 1;
        }

        for key in KEYS {
            prop_assert_eq!(cache.access_count(key), expected.get(key).copied().unwrap_or(0));
        }
    }

    #[test]
    fn fetch_runs_only_until_a_body_is_cached(
        calls in prop::collection::vec((0..KEYS.len(), outcome()), 0..64)
    ) {
        let cache: FetchCache<String> = FetchCache::new();
        let mut cached: HashSet<&str> = HashSet::new();

        for (index, outcome) in &calls {
            let key = KEYS[*index];
            let mut fetched = false;
            let result = cache.get_or_fetch(key, Duration::from_secs(60), || {
                fetched = true;
                match outcome {
                    Outcome::Body => Ok(format!("body of {key}")),
                    Outcome::Empty => Ok(String::new()),
                    Outcome::Failure => Err(io::Error::new(io::ErrorKind::Other, "down")),
                }
            });

            prop_assert_eq!(fetched, !cached.contains(key));
            if cached.contains(key) {
                prop_assert_eq!(result.unwrap(), format!("body of {key}"));
            } else if matches!(outcome, Outcome::Body) {
                cached.insert(key);
            }
        }

        prop_assert_eq!(cache.len(), cached.len());
    }
}
