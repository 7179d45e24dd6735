//! Fixed-window counting.
//!
//! Each throttle key owns at most one `WindowState`. The state is opened by
//! the first admitted request, counts admissions until the limit is reached,
//! and is replaced by a fresh window once the old one has elapsed.
//!
//! This is a fixed-window counter, not a sliding log: a client can be admitted
//! `limit` times at the very end of one window and `limit` times again at the
//! start of the next, i.e. up to `2 * limit` requests across a boundary.

use crate::domain::limits::WindowLimit;
use std::time::{Duration, Instant};

/// Outcome of a throttle check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The request may proceed
    Admitted {
        /// Admissions left in the current window
        remaining: u32,
    },
    /// The request must be turned away
    Rejected {
        /// Time until the current window ends
        retry_after: Duration,
    },
}

impl Decision {
    /// Decision for the request that opens a new window.
    pub fn first_in_window(limit: WindowLimit) -> Self {
        Decision::Admitted {
            remaining: limit.limit() - 1,
        }
    }

    /// Check if this decision is Admitted.
    pub fn is_admitted(&self) -> bool {
        matches!(self, Decision::Admitted { .. })
    }

    /// Check if this decision is Rejected.
    pub fn is_rejected(&self) -> bool {
        matches!(self, Decision::Rejected { .. })
    }

    /// Remaining quota, or zero for a rejection.
    pub fn remaining(&self) -> u32 {
        match self {
            Decision::Admitted { remaining } => *remaining,
            Decision::Rejected { .. } => 0,
        }
    }

    /// Retry hint, if rejected.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Decision::Admitted { .. } => None,
            Decision::Rejected { retry_after } => Some(*retry_after),
        }
    }
}

/// Counter state of one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowState {
    count: u32,
    window_start: Instant,
    window: Duration,
}

impl WindowState {
    /// Open a window for an admitted request at `now`.
    ///
    /// The opening request is counted, so `count` starts at 1.
    pub fn open(now: Instant, window: Duration) -> Self {
        Self {
            count: 1,
            window_start: now,
            window,
        }
    }

    /// Rebuild a state from stored parts.
    pub fn from_parts(count: u32, window_start: Instant, window: Duration) -> Self {
        Self {
            count,
            window_start,
            window,
        }
    }

    /// Apply the fixed-window rule to an optional current state.
    ///
    /// `None` means the key has no window yet; it is filled in on admission.
    pub fn register(slot: &mut Option<WindowState>, now: Instant, limit: WindowLimit) -> Decision {
        match slot {
            Some(state) => state.record(now, limit),
            None => {
                *slot = Some(WindowState::open(now, limit.window()));
                Decision::first_in_window(limit)
            }
        }
    }

    /// Apply the fixed-window rule to this state.
    ///
    /// A rejection leaves the state untouched.
    pub fn record(&mut self, now: Instant, limit: WindowLimit) -> Decision {
        if now.saturating_duration_since(self.window_start) > limit.window() {
            *self = WindowState::open(now, limit.window());
            return Decision::first_in_window(limit);
        }

        if self.count >= limit.limit() {
            let elapsed = now.saturating_duration_since(self.window_start);
            return Decision::Rejected {
                retry_after: limit.window().saturating_sub(elapsed),
            };
        }

        self.count += 1;
        self.window = limit.window();
        Decision::Admitted {
            remaining: limit.limit() - self.count,
        }
    }

    /// Requests admitted in the current window.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// When the current window opened.
    pub fn window_start(&self) -> Instant {
        self.window_start
    }

    /// Length the window was opened with.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Whether the window has elapsed at `now`.
    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.window_start) > self.window
    }

    /// How long ago the window ended, or `None` while it is still running.
    pub fn expired_for(&self, now: Instant) -> Option<Duration> {
        if !self.is_expired(now) {
            return None;
        }
        let window_end = self.window_start.checked_add(self.window)?;
        Some(now.saturating_duration_since(window_end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limit(n: u32, ms: u64) -> WindowLimit {
        WindowLimit::new(n, Duration::from_millis(ms)).unwrap()
    }

    #[test]
    fn test_first_request_opens_window() {
        let now = Instant::now();
        let mut slot = None;

        let decision = WindowState::register(&mut slot, now, limit(3, 1000));

        assert_eq!(decision, Decision::Admitted { remaining: 2 });
        let state = slot.unwrap();
        assert_eq!(state.count(), 1);
        assert_eq!(state.window_start(), now);
    }

    #[test]
    fn test_concrete_scenario() {
        let t0 = Instant::now();
        let at = |ms| t0 + Duration::from_millis(ms);
        let l = limit(3, 1000);
        let mut slot = None;

        assert_eq!(WindowState::register(&mut slot, at(0), l), Decision::Admitted { remaining: 2 });
        assert_eq!(WindowState::register(&mut slot, at(100), l), Decision::Admitted { remaining: 1 });
        assert_eq!(WindowState::register(&mut slot, at(200), l), Decision::Admitted { remaining: 0 });
        assert_eq!(
            WindowState::register(&mut slot, at(300), l),
            Decision::Rejected {
                retry_after: Duration::from_millis(700)
            }
        );

        // New window
        assert_eq!(WindowState::register(&mut slot, at(1001), l), Decision::Admitted { remaining: 2 });
        let state = slot.unwrap();
        assert_eq!(state.count(), 1);
        assert_eq!(state.window_start(), at(1001));
    }

    #[test]
    fn test_rejection_does_not_mutate() {
        let t0 = Instant::now();
        let l = limit(1, 1000);
        let mut state = WindowState::open(t0, l.window());

        let before = state;
        let first = state.record(t0 + Duration::from_millis(10), l);
        let second = state.record(t0 + Duration::from_millis(500), l);

        assert_eq!(state, before);
        assert_eq!(first.retry_after(), Some(Duration::from_millis(990)));
        assert_eq!(second.retry_after(), Some(Duration::from_millis(500)));
    }

    #[test]
    fn test_boundary_is_inside_window() {
        let t0 = Instant::now();
        let l = limit(1, 1000);
        let mut state = WindowState::open(t0, l.window());

        // Exactly `window` later the window has not yet expired
        let decision = state.record(t0 + Duration::from_millis(1000), l);
        assert_eq!(
            decision,
            Decision::Rejected {
                retry_after: Duration::ZERO
            }
        );

        let decision = state.record(t0 + Duration::from_millis(1001), l);
        assert!(decision.is_admitted());
    }

    #[test]
    fn test_time_before_window_start_counts_inside() {
        let t0 = Instant::now() + Duration::from_secs(10);
        let l = limit(2, 1000);
        let mut state = WindowState::open(t0, l.window());

        let decision = state.record(t0 - Duration::from_millis(5), l);
        assert_eq!(decision, Decision::Admitted { remaining: 0 });
        assert_eq!(state.window_start(), t0);
    }

    #[test]
    fn test_boundary_burst() {
        let t0 = Instant::now();
        let l = limit(2, 1000);
        let mut slot = None;

        let late = t0 + Duration::from_millis(999);
        let early = t0 + Duration::from_millis(1001);

        assert!(WindowState::register(&mut slot, t0, l).is_admitted());
        assert!(WindowState::register(&mut slot, late, l).is_admitted());
        assert!(WindowState::register(&mut slot, early, l).is_admitted());
        assert!(WindowState::register(&mut slot, early, l).is_admitted());
        assert!(WindowState::register(&mut slot, early, l).is_rejected());
    }

    #[test]
    fn test_expired_for() {
        let t0 = Instant::now();
        let state = WindowState::open(t0, Duration::from_millis(1000));

        assert!(!state.is_expired(t0 + Duration::from_millis(1000)));
        assert_eq!(state.expired_for(t0 + Duration::from_millis(500)), None);
        assert_eq!(
            state.expired_for(t0 + Duration::from_millis(1500)),
            Some(Duration::from_millis(500))
        );
    }

    #[test]
    fn test_admission_records_latest_window() {
        let t0 = Instant::now();
        let mut slot = None;

        WindowState::register(&mut slot, t0, limit(5, 1000));
        WindowState::register(&mut slot, t0 + Duration::from_millis(10), limit(5, 2000));
        assert_eq!(slot.unwrap().window(), Duration::from_millis(2000));

        // Rejections leave the recorded window alone
        let mut state = WindowState::open(t0, Duration::from_millis(1000));
        state.record(t0, limit(1, 3000));
        assert_eq!(state.window(), Duration::from_millis(1000));
    }

    #[test]
    fn test_unbounded_window_does_not_overflow() {
        let t0 = Instant::now();
        let l = WindowLimit::new(1, Duration::MAX).unwrap();
        let mut slot = None;

        assert!(WindowState::register(&mut slot, t0, l).is_admitted());
        let decision = WindowState::register(&mut slot, t0 + Duration::from_secs(5), l);
        assert_eq!(
            decision,
            Decision::Rejected {
                retry_after: Duration::MAX - Duration::from_secs(5)
            }
        );

        let state = slot.unwrap();
        assert!(!state.is_expired(t0 + Duration::from_secs(3600)));
        assert_eq!(state.expired_for(t0 + Duration::from_secs(3600)), None);
    }

    #[test]
    fn test_decision_helpers() {
        let admitted = Decision::Admitted { remaining: 4 };
        let rejected = Decision::Rejected {
            retry_after: Duration::from_secs(3),
        };

        assert!(admitted.is_admitted());
        assert!(!admitted.is_rejected());
        assert_eq!(admitted.remaining(), 4);
        assert_eq!(admitted.retry_after(), None);

        assert!(rejected.is_rejected());
        assert_eq!(rejected.remaining(), 0);
        assert_eq!(rejected.retry_after(), Some(Duration::from_secs(3)));
    }
}
