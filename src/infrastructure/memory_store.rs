//! In-process window store.
//!
//! Provides concurrent, sharded storage for per-key window state.

use crate::application::ports::{StoreError, WindowStore};
use crate::domain::{
    key::ThrottleKey,
    limits::WindowLimit,
    window::{Decision, WindowState},
};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::time::{Duration, Instant};

/// Thread-safe sharded window store backed by DashMap.
///
/// Each key lives in one shard; a `hit` holds that shard's write lock for the
/// whole read-decide-write step, so requests for the same key are serialized
/// while requests for keys in other shards proceed in parallel.
#[derive(Debug)]
pub struct MemoryStore {
    map: DashMap<ThrottleKey, WindowState, ahash::RandomState>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            map: DashMap::with_hasher(ahash::RandomState::new()),
        }
    }

    /// Create an empty store sized for about `capacity` keys.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            map: DashMap::with_capacity_and_hasher(capacity, ahash::RandomState::new()),
        }
    }

    fn apply(&self, key: &ThrottleKey, now: Instant, limit: WindowLimit) -> Decision {
        // Existing keys avoid cloning the key for the entry API
        if let Some(mut state) = self.map.get_mut(key) {
            return state.record(now, limit);
        }

        match self.map.entry(key.clone()) {
            Entry::Occupied(mut entry) => entry.get_mut().record(now, limit),
            Entry::Vacant(entry) => {
                entry.insert(WindowState::open(now, limit.window()));
                Decision::first_in_window(limit)
            }
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowStore for MemoryStore {
    fn hit(
        &self,
        key: &ThrottleKey,
        now: Instant,
        limit: WindowLimit,
    ) -> Result<Decision, StoreError> {
        Ok(self.apply(key, now, limit))
    }

    fn peek(&self, key: &ThrottleKey) -> Result<Option<WindowState>, StoreError> {
        Ok(self.map.get(key).map(|state| *state))
    }

    fn remove(&self, key: &ThrottleKey) -> Result<bool, StoreError> {
        Ok(self.map.remove(key).is_some())
    }

    fn sweep(&self, now: Instant, max_age: Duration) -> Result<usize, StoreError> {
        let mut removed = 0;
        // retain runs the predicate under each shard's write lock
        self.map.retain(|_, state| match state.expired_for(now) {
            Some(age) if age > max_age => {
                removed += 1;
                false
            }
            _ => true,
        });
        Ok(removed)
    }

    fn len(&self) -> usize {
        self.map.len()
    }

    fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    fn clear(&self) {
        self.map.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn key(id: &str) -> ThrottleKey {
        ThrottleKey::new(id, "api")
    }

    fn limit(n: u32, ms: u64) -> WindowLimit {
        WindowLimit::new(n, Duration::from_millis(ms)).unwrap()
    }

    #[test]
    fn test_hit_counts_per_key() {
        let store = MemoryStore::new();
        let now = Instant::now();
        let l = limit(2, 1000);

        assert_eq!(store.hit(&key("a"), now, l).unwrap(), Decision::Admitted { remaining: 1 });
        assert_eq!(store.hit(&key("a"), now, l).unwrap(), Decision::Admitted { remaining: 0 });
        assert!(store.hit(&key("a"), now, l).unwrap().is_rejected());

        // Other identifiers are independent
        assert_eq!(store.hit(&key("b"), now, l).unwrap(), Decision::Admitted { remaining: 1 });
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_same_identifier_different_category() {
        let store = MemoryStore::new();
        let now = Instant::now();
        let l = limit(1, 1000);

        assert!(store.hit(&ThrottleKey::new("a", "search"), now, l).unwrap().is_admitted());
        assert!(store.hit(&ThrottleKey::new("a", "admin"), now, l).unwrap().is_admitted());
        assert!(store.hit(&ThrottleKey::new("a", "search"), now, l).unwrap().is_rejected());
    }

    #[test]
    fn test_peek_and_remove() {
        let store = MemoryStore::new();
        let now = Instant::now();

        assert_eq!(store.peek(&key("a")).unwrap(), None);
        store.hit(&key("a"), now, limit(5, 1000)).unwrap();

        let state = store.peek(&key("a")).unwrap().unwrap();
        assert_eq!(state.count(), 1);
        assert_eq!(state.window_start(), now);

        assert!(store.remove(&key("a")).unwrap());
        assert!(!store.remove(&key("a")).unwrap());
        assert!(store.is_empty());
    }

    #[test]
    fn test_sweep_keeps_live_windows() {
        let store = MemoryStore::new();
        let t0 = Instant::now();

        store.hit(&key("short"), t0, limit(5, 1000)).unwrap();
        store.hit(&key("long"), t0, limit(5, 60_000)).unwrap();

        // Exactly at the boundary nothing has expired
        assert_eq!(store.sweep(t0 + Duration::from_millis(1000), Duration::ZERO).unwrap(), 0);

        let later = t0 + Duration::from_millis(1500);
        assert_eq!(store.sweep(later, Duration::from_secs(1)).unwrap(), 0);
        assert_eq!(store.sweep(later, Duration::ZERO).unwrap(), 1);
        assert!(store.peek(&key("long")).unwrap().is_some());
    }

    #[test]
    fn test_clear() {
        let store = MemoryStore::with_capacity(16);
        let now = Instant::now();
        for i in 0..10 {
            store.hit(&key(&format!("10.0.0.{}", i)), now, limit(5, 1000)).unwrap();
        }
        assert_eq!(store.len(), 10);

        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn test_concurrent_hits_same_key() {
        let store = Arc::new(MemoryStore::new());
        let now = Instant::now();
        let l = limit(100, 60_000);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    (0..50)
                        .filter(|_| store.hit(&key("shared"), now, l).unwrap().is_admitted())
                        .count()
                })
            })
            .collect();

        let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(admitted, 100);
        assert_eq!(store.peek(&key("shared")).unwrap().unwrap().count(), 100);
    }

    #[test]
    fn test_sweep_concurrent_with_hits() {
        let store = Arc::new(MemoryStore::new());
        let t0 = Instant::now();
        let l = limit(1_000_000, 1000);
        let later = t0 + Duration::from_secs(5);

        // Every key starts expired
        for i in 0..100 {
            store.hit(&key(&i.to_string()), t0, l).unwrap();
        }

        let hitter = {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..100 {
                    store.hit(&key(&i.to_string()), later, l).unwrap();
                }
            })
        };
        store.sweep(later, Duration::ZERO).unwrap();
        hitter.join().unwrap();

        // Whatever the interleaving, refreshed windows survive and are fresh
        for i in 0..100 {
            if let Some(state) = store.peek(&key(&i.to_string())).unwrap() {
                assert_eq!(state.window_start(), later);
            }
        }
        assert_eq!(store.sweep(later, Duration::ZERO).unwrap(), 0);
    }
}
