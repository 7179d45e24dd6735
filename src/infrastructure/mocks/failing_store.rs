//! Window store that fails on demand.

use crate::application::ports::{StoreError, WindowStore};
use crate::domain::{
    key::ThrottleKey,
    limits::WindowLimit,
    window::{Decision, WindowState},
};
use crate::infrastructure::memory_store::MemoryStore;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// In-memory store whose operations can be made to error or panic.
///
/// While healthy it behaves exactly like `MemoryStore`. Use it to exercise the
/// throttle's fail-open path and circuit breaker, e.g. to stand in for a Redis
/// outage.
///
/// ```
/// use request_throttle::infrastructure::mocks::FailingStore;
/// use request_throttle::Throttle;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let store = Arc::new(FailingStore::new());
/// let throttle = Throttle::builder()
///     .build_with_store(Arc::clone(&store))
///     .unwrap();
///
/// store.set_failing(true);
/// // Store errors admit the request
/// assert!(throttle.check("10.0.0.1", "api", 1, Duration::from_secs(60)).is_admitted());
/// assert!(throttle.check("10.0.0.1", "api", 1, Duration::from_secs(60)).is_admitted());
/// assert_eq!(throttle.metrics().failed_open(), 2);
/// ```
#[derive(Debug, Default)]
pub struct FailingStore {
    inner: MemoryStore,
    failing: AtomicBool,
    panicking: AtomicBool,
    calls: AtomicU64,
}

impl FailingStore {
    /// Create a healthy store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every operation return `StoreError::Unavailable`.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Make every operation panic.
    pub fn set_panicking(&self, panicking: bool) {
        self.panicking.store(panicking, Ordering::SeqCst);
    }

    /// Number of fallible operations attempted.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    fn gate(&self) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.panicking.load(Ordering::SeqCst) {
            panic!("FailingStore: injected panic");
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected failure".to_string()));
        }
        Ok(())
    }
}

impl WindowStore for FailingStore {
    fn hit(
        &self,
        key: &ThrottleKey,
        now: Instant,
        limit: WindowLimit,
    ) -> Result<Decision, StoreError> {
        self.gate()?;
        self.inner.hit(key, now, limit)
    }

    fn peek(&self, key: &ThrottleKey) -> Result<Option<WindowState>, StoreError> {
        self.gate()?;
        self.inner.peek(key)
    }

    fn remove(&self, key: &ThrottleKey) -> Result<bool, StoreError> {
        self.gate()?;
        self.inner.remove(key)
    }

    fn sweep(&self, now: Instant, max_age: Duration) -> Result<usize, StoreError> {
        self.gate()?;
        self.inner.sweep(now, max_age)
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    fn clear(&self) {
        self.inner.clear()
    }
}
