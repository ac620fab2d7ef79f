//! Populate-once caches shared between extraction threads

use dashmap::DashMap;
use std::hash::Hash;
use std::sync::{Arc, OnceLock};

/// Concurrent cache where each key is computed at most once
///
/// Concurrent lookups of a missing key collapse into a single computation;
/// the other callers block until its result is available. The shard lock is
/// released before computing, so computations for different keys run in
/// parallel.
pub struct SingleFlightCache<K, V> {
    entries: DashMap<K, Arc<OnceLock<V>>>,
}

impl<K, V> SingleFlightCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Return the cached value for `key`, computing it with `compute` if absent
    pub fn get_or_compute(&self, key: &K, compute: impl FnOnce() -> V) -> V {
        let cell = self
            .entries
            .entry(key.clone())
            .or_insert_with(|| Arc::new(OnceLock::new()))
            .clone();
        cell.get_or_init(compute).clone()
    }

    /// Cached value, if it has been computed
    pub fn get(&self, key: &K) -> Option<V> {
        self.entries
            .get(key)
            .and_then(|cell| cell.value().get().cloned())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl<K, V> Default for SingleFlightCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_concurrent_lookups_compute_once() {
        let cache: Arc<SingleFlightCache<String, usize>> = Arc::new(SingleFlightCache::new());
        let computations = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let computations = Arc::clone(&computations);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    cache.get_or_compute(&"schema".to_string(), || {
                        computations.fetch_add(1, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(20));
                        42
                    })
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 42);
        }
        assert_eq!(computations.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_distinct_keys_are_cached_separately() {
        let cache = SingleFlightCache::new();
        assert_eq!(cache.get_or_compute(&1, || "one"), "one");
        assert_eq!(cache.get_or_compute(&2, || "two"), "two");
        assert_eq!(cache.get_or_compute(&1, || "ignored"), "one");
        assert_eq!(cache.get(&2), Some("two"));
        assert_eq!(cache.get(&3), None);

        cache.clear();
        assert!(cache.is_empty());
    }
}
