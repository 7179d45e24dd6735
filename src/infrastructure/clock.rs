//! Clock adapters for time operations.
//!
//! Provides SystemClock implementation for production use.
//!
//! # Testing
//!
//! See `MockClock` (in `crate::infrastructure::mocks`) for a controllable test
//! clock, available with the `test-helpers` feature or in test builds.

use crate::application::ports::Clock;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// System clock implementation using `Instant::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Create a new system clock.
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Pairs a monotonic instant with Unix wall-clock milliseconds.
///
/// Stores shared between processes need a common time base. Instants from
/// the throttle's clock are converted by offsetting from the pair captured
/// at construction.
#[derive(Debug, Clone, Copy)]
pub struct WallClockBase {
    instant: Instant,
    unix_ms: u64,
}

impl WallClockBase {
    /// Capture the current instant and wall-clock time.
    pub fn capture(now: Instant) -> Self {
        let unix_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self::from_parts(now, unix_ms)
    }

    /// Use an explicit pair.
    pub fn from_parts(instant: Instant, unix_ms: u64) -> Self {
        Self { instant, unix_ms }
    }

    /// Unix milliseconds for `at`.
    pub fn unix_ms(&self, at: Instant) -> u64 {
        if at >= self.instant {
            let ahead = at.duration_since(self.instant).as_millis() as u64;
            self.unix_ms.saturating_add(ahead)
        } else {
            let behind = self.instant.duration_since(at).as_millis() as u64;
            self.unix_ms.saturating_sub(behind)
        }
    }

    /// Instant for Unix milliseconds `ms`.
    pub fn instant(&self, ms: u64) -> Instant {
        use std::time::Duration;
        if ms >= self.unix_ms {
            self.instant + Duration::from_millis(ms - self.unix_ms)
        } else {
            let behind = Duration::from_millis(self.unix_ms - ms);
            self.instant.checked_sub(behind).unwrap_or(self.instant)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_system_clock() {
        let clock = SystemClock::new();
        let t1 = clock.now();
        std::thread::sleep(Duration::from_millis(10));
        let t2 = clock.now();

        assert!(t2 > t1);
    }

    #[test]
    fn test_wall_clock_base_conversion() {
        let t0 = Instant::now();
        let base = WallClockBase::from_parts(t0, 1_700_000_000_000);

        assert_eq!(base.unix_ms(t0), 1_700_000_000_000);
        assert_eq!(base.unix_ms(t0 + Duration::from_millis(1500)), 1_700_000_001_500);
        assert_eq!(base.instant(1_700_000_000_250), t0 + Duration::from_millis(250));
    }

    #[test]
    fn test_wall_clock_base_before_capture() {
        let t0 = Instant::now() + Duration::from_secs(10);
        let base = WallClockBase::from_parts(t0, 10_000);

        assert_eq!(base.unix_ms(t0 - Duration::from_secs(2)), 8_000);
        assert_eq!(base.instant(8_000), t0 - Duration::from_secs(2));
    }
}
