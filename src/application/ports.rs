//! Ports (interfaces) for the application layer.
//!
//! In hexagonal architecture, ports define the interfaces that the application
//! layer needs. Infrastructure adapters implement these ports.

use crate::domain::{
    key::ThrottleKey,
    limits::WindowLimit,
    window::{Decision, WindowState},
};
use std::fmt::{self, Debug};
use std::time::{Duration, Instant};

/// Port for obtaining current time.
///
/// This abstraction allows the application layer to work with time
/// without depending on system clock implementation details.
/// Infrastructure provides concrete implementations (SystemClock, MockClock).
pub trait Clock: Send + Sync + Debug {
    /// Get the current instant.
    fn now(&self) -> Instant;
}

/// Error raised by a window store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backing store could not be reached or refused the command
    Unavailable(String),
    /// Stored state for a key could not be decoded
    Corrupted {
        /// The affected key
        key: String,
        /// What was wrong with it
        reason: String,
    },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Unavailable(msg) => write!(f, "window store unavailable: {}", msg),
            StoreError::Corrupted { key, reason } => {
                write!(f, "corrupted window state for {}: {}", key, reason)
            }
        }
    }
}

impl std::error::Error for StoreError {}

/// Port for per-key window storage.
///
/// `hit` is the only mutating operation on the request path. It must
/// look up the state for `key`, open a new window if there is none or the old
/// one has elapsed, and otherwise count or reject the request, all as one
/// atomic step with respect to other calls for the same key. Calls for
/// different keys must not serialize on each other.
///
/// Infrastructure provides `MemoryStore` (single process) and, with the
/// `redis-storage` feature, `RedisStore` (shared across instances).
pub trait WindowStore: Send + Sync + Debug {
    /// Count a request against `key` and return the decision.
    ///
    /// A rejection must leave the stored state unchanged.
    fn hit(&self, key: &ThrottleKey, now: Instant, limit: WindowLimit)
        -> Result<Decision, StoreError>;

    /// Read the current state for `key` without modifying it.
    fn peek(&self, key: &ThrottleKey) -> Result<Option<WindowState>, StoreError>;

    /// Remove the state for `key`. Returns whether anything was removed.
    fn remove(&self, key: &ThrottleKey) -> Result<bool, StoreError>;

    /// Remove every entry whose window ended more than `max_age` before `now`.
    ///
    /// The expiry test must be evaluated under the same lock `hit` takes for
    /// that key, so an entry refreshed concurrently is never dropped.
    /// Returns the number of entries removed.
    fn sweep(&self, now: Instant, max_age: Duration) -> Result<usize, StoreError>;

    /// Number of tracked keys.
    fn len(&self) -> usize;

    /// Whether no keys are tracked.
    fn is_empty(&self) -> bool;

    /// Drop all state.
    fn clear(&self);
}

impl<T> WindowStore for std::sync::Arc<T>
where
    T: WindowStore + ?Sized,
{
    fn hit(
        &self,
        key: &ThrottleKey,
        now: Instant,
        limit: WindowLimit,
    ) -> Result<Decision, StoreError> {
        (**self).hit(key, now, limit)
    }

    fn peek(&self, key: &ThrottleKey) -> Result<Option<WindowState>, StoreError> {
        (**self).peek(key)
    }

    fn remove(&self, key: &ThrottleKey) -> Result<bool, StoreError> {
        (**self).remove(key)
    }

    fn sweep(&self, now: Instant, max_age: Duration) -> Result<usize, StoreError> {
        (**self).sweep(now, max_age)
    }

    fn len(&self) -> usize {
        (**self).len()
    }

    fn is_empty(&self) -> bool {
        (**self).is_empty()
    }

    fn clear(&self) {
        (**self).clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_display() {
        let err = StoreError::Unavailable("connection refused".to_string());
        assert_eq!(err.to_string(), "window store unavailable: connection refused");

        let err = StoreError::Corrupted {
            key: "10.0.0.1:api".to_string(),
            reason: "missing start_ms".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "corrupted window state for 10.0.0.1:api: missing start_ms"
        );
    }
}
