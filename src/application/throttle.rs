//! Throttle coordination logic.
//!
//! The throttle decides whether a request should be admitted or rejected. It
//! owns the window store, the clock, the category limit table, metrics, and
//! the circuit breaker that lets it keep serving when a remote store fails.
//!
//! A `Throttle` is an ordinary value: construct it at startup, hand clones to
//! request handlers, drop it at shutdown. Clones share all state.

use crate::application::{
    builder::ThrottleBuilder,
    circuit_breaker::CircuitBreaker,
    limits::LimitTable,
    metrics::Metrics,
    ports::{Clock, StoreError, WindowStore},
};
use crate::domain::{
    key::ThrottleKey,
    limits::WindowLimit,
    window::{Decision, WindowState},
};
use std::panic;
use std::sync::Arc;
use std::time::Duration;

/// Per-client, per-category fixed-window throttle.
pub struct Throttle<S>
where
    S: WindowStore,
{
    inner: Arc<Inner<S>>,
}

struct Inner<S> {
    store: S,
    clock: Arc<dyn Clock>,
    limits: LimitTable,
    metrics: Metrics,
    circuit_breaker: CircuitBreaker,
}

impl<S> Clone for Throttle<S>
where
    S: WindowStore,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S> std::fmt::Debug for Throttle<S>
where
    S: WindowStore,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Throttle")
            .field("store", &self.inner.store)
            .field("limits", &self.inner.limits)
            .field("circuit_state", &self.inner.circuit_breaker.state())
            .finish_non_exhaustive()
    }
}

impl Throttle<crate::infrastructure::memory_store::MemoryStore> {
    /// Start building a throttle.
    pub fn builder() -> ThrottleBuilder {
        ThrottleBuilder::new()
    }
}

impl<S> Throttle<S>
where
    S: WindowStore,
{
    /// Assemble a throttle from its parts.
    ///
    /// Prefer `Throttle::builder()`; this is the seam the builder uses.
    pub fn from_parts(
        store: S,
        clock: Arc<dyn Clock>,
        limits: LimitTable,
        circuit_breaker: CircuitBreaker,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                clock,
                limits,
                metrics: Metrics::new(),
                circuit_breaker,
            }),
        }
    }

    /// Decide whether a request from `identifier` to `category` is admitted.
    ///
    /// At most `limit` requests are admitted per key per `window`.
    ///
    /// # Panics
    /// Panics if `identifier` is empty, `limit` is zero, or `window` is zero.
    /// These are configuration bugs, not runtime conditions.
    pub fn check(&self, identifier: &str, category: &str, limit: u32, window: Duration) -> Decision {
        let limit = match WindowLimit::new(limit, window) {
            Ok(limit) => limit,
            Err(e) => panic!("invalid throttle limit for category {:?}: {}", category, e),
        };
        self.check_limit(identifier, category, limit)
    }

    /// Like `check`, with a pre-validated limit.
    ///
    /// # Panics
    /// Panics if `identifier` is empty.
    pub fn check_limit(&self, identifier: &str, category: &str, limit: WindowLimit) -> Decision {
        assert!(
            !identifier.is_empty(),
            "throttle identifier must not be empty"
        );
        let key = ThrottleKey::new(identifier, category);

        if !self.inner.circuit_breaker.allow_request() {
            self.inner.metrics.record_failed_open();
            return Decision::first_in_window(limit);
        }

        let now = self.inner.clock.now();
        let result = panic::catch_unwind(panic::AssertUnwindSafe(|| {
            self.inner.store.hit(&key, now, limit)
        }));

        let decision = match result {
            Ok(Ok(decision)) => {
                self.inner.circuit_breaker.record_success();
                decision
            }
            Ok(Err(e)) => return self.fail_open(&key, limit, &e),
            Err(_) => {
                let e = StoreError::Unavailable("store panicked".to_string());
                return self.fail_open(&key, limit, &e);
            }
        };

        match decision {
            Decision::Admitted { .. } => self.inner.metrics.record_admitted(),
            Decision::Rejected { retry_after } => {
                self.inner.metrics.record_rejected();
                tracing::debug!(
                    key = %key,
                    retry_after_ms = retry_after.as_millis() as u64,
                    "request rejected"
                );
            }
        }

        decision
    }

    /// Check against the limit configured for `category`.
    ///
    /// Unknown categories get the default category's limit but keep their
    /// own window.
    pub fn check_category(&self, identifier: &str, category: &str) -> Decision {
        let limit = self.inner.limits.limit_for(category);
        self.check_limit(identifier, category, limit)
    }

    fn fail_open(&self, key: &ThrottleKey, limit: WindowLimit, error: &StoreError) -> Decision {
        self.inner.circuit_breaker.record_failure();
        self.inner.metrics.record_failed_open();
        tracing::warn!(
            key = %key,
            error = %error,
            circuit = ?self.inner.circuit_breaker.state(),
            "window store failed, admitting request"
        );
        Decision::first_in_window(limit)
    }

    /// Clear the window for one key, e.g. to unblock a client.
    ///
    /// Returns whether a window existed. Store failures are logged and
    /// reported as `false`.
    pub fn reset(&self, identifier: &str, category: &str) -> bool {
        let key = ThrottleKey::new(identifier, category);
        self.inner.metrics.record_reset();
        match self.inner.store.remove(&key) {
            Ok(removed) => {
                tracing::info!(key = %key, removed, "throttle window reset");
                removed
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "failed to reset throttle window");
                false
            }
        }
    }

    /// Drop windows that ended more than `max_age` ago.
    ///
    /// Windows still running are never removed. Returns the number of
    /// entries removed.
    pub fn sweep(&self, max_age: Duration) -> usize {
        let now = self.inner.clock.now();
        match self.inner.store.sweep(now, max_age) {
            Ok(removed) => {
                self.inner.metrics.record_swept(removed);
                if removed > 0 {
                    tracing::info!(
                        removed,
                        remaining = self.inner.store.len(),
                        "swept expired throttle windows"
                    );
                }
                removed
            }
            Err(e) => {
                tracing::warn!(error = %e, "throttle sweep failed");
                0
            }
        }
    }

    /// Current window for a key, if any.
    pub fn peek(&self, identifier: &str, category: &str) -> Option<WindowState> {
        let key = ThrottleKey::new(identifier, category);
        match self.inner.store.peek(&key) {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "failed to read throttle window");
                None
            }
        }
    }

    /// Number of keys currently tracked by the store.
    pub fn tracked_keys(&self) -> usize {
        self.inner.store.len()
    }

    /// Get the configured category limits.
    pub fn limits(&self) -> &LimitTable {
        &self.inner.limits
    }

    /// Get a reference to the metrics.
    pub fn metrics(&self) -> &Metrics {
        &self.inner.metrics
    }

    /// Get a reference to the circuit breaker.
    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.inner.circuit_breaker
    }

    /// Get a reference to the store.
    pub fn store(&self) -> &S {
        &self.inner.store
    }

    /// Current time according to the throttle's clock.
    pub fn now(&self) -> std::time::Instant {
        self.inner.clock.now()
    }
}
