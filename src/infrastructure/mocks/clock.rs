//! Hand-driven clock for throttle tests.

use crate::application::ports::Clock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Clock that only moves when a test advances it.
///
/// Windows expire, circuits recover and sweeps find stale entries exactly
/// when the test says so, without sleeping. Clones share one timeline.
///
/// ```
/// use request_throttle::infrastructure::mocks::MockClock;
/// use request_throttle::{Decision, Throttle};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let clock = MockClock::starting_now();
/// let throttle = Throttle::builder()
///     .with_clock(Arc::new(clock.clone()))
///     .build()
///     .unwrap();
/// let window = Duration::from_secs(60);
///
/// assert!(throttle.check("203.0.113.7", "search", 1, window).is_admitted());
///
/// clock.advance(Duration::from_secs(45));
/// assert_eq!(
///     throttle.check("203.0.113.7", "search", 1, window),
///     Decision::Rejected { retry_after: Duration::from_secs(15) }
/// );
///
/// // At exactly one window the old window is still live
/// clock.advance(Duration::from_secs(15));
/// assert!(throttle.check("203.0.113.7", "search", 1, window).is_rejected());
///
/// clock.advance_ms(1);
/// assert_eq!(
///     throttle.check("203.0.113.7", "search", 1, window),
///     Decision::Admitted { remaining: 0 }
/// );
/// ```
#[derive(Debug, Clone)]
pub struct MockClock {
    origin: Instant,
    offset_nanos: Arc<AtomicU64>,
}

impl MockClock {
    /// Clock reading `origin` until advanced.
    pub fn new(origin: Instant) -> Self {
        Self {
            origin,
            offset_nanos: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Clock reading the current instant until advanced.
    pub fn starting_now() -> Self {
        Self::new(Instant::now())
    }

    /// Move time forward for every clone.
    pub fn advance(&self, by: Duration) {
        let nanos = u64::try_from(by.as_nanos()).unwrap_or(u64::MAX);
        self.offset_nanos.fetch_add(nanos, Ordering::SeqCst);
    }

    /// Move time forward by `ms` milliseconds.
    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }

    /// Total time advanced since creation.
    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.offset_nanos.load(Ordering::SeqCst))
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::starting_now()
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }
}
