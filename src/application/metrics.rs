//! Observability metrics for throttling.
//!
//! Counters are updated on every check and can be read at any time, e.g. from
//! a health endpoint or a periodic reporter.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Metrics tracking throttle activity.
///
/// Cloning is cheap and all clones share the same counters.
#[derive(Debug, Clone, Default)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

#[derive(Debug, Default)]
struct MetricsInner {
    admitted: AtomicU64,
    rejected: AtomicU64,
    /// Admitted without consulting the store (store error or open circuit)
    failed_open: AtomicU64,
    swept: AtomicU64,
    resets: AtomicU64,
}

impl Metrics {
    /// Create a new metrics tracker.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_admitted(&self) {
        self.inner.admitted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected(&self) {
        self.inner.rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Also counts as admitted.
    pub(crate) fn record_failed_open(&self) {
        self.inner.failed_open.fetch_add(1, Ordering::Relaxed);
        self.record_admitted();
    }

    pub(crate) fn record_swept(&self, removed: usize) {
        self.inner
            .swept
            .fetch_add(removed as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_reset(&self) {
        self.inner.resets.fetch_add(1, Ordering::Relaxed);
    }

    /// Requests admitted, including fail-open admissions.
    pub fn admitted(&self) -> u64 {
        self.inner.admitted.load(Ordering::Relaxed)
    }

    /// Requests rejected.
    pub fn rejected(&self) -> u64 {
        self.inner.rejected.load(Ordering::Relaxed)
    }

    /// Requests admitted because the store could not be used.
    pub fn failed_open(&self) -> u64 {
        self.inner.failed_open.load(Ordering::Relaxed)
    }

    /// Window entries removed by sweeps.
    pub fn swept(&self) -> u64 {
        self.inner.swept.load(Ordering::Relaxed)
    }

    /// Administrative resets performed.
    pub fn resets(&self) -> u64 {
        self.inner.resets.load(Ordering::Relaxed)
    }

    /// Get a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            admitted: self.admitted(),
            rejected: self.rejected(),
            failed_open: self.failed_open(),
            swept: self.swept(),
            resets: self.resets(),
        }
    }

    /// Reset all metrics to zero.
    pub fn reset(&self) {
        self.inner.admitted.store(0, Ordering::Relaxed);
        self.inner.rejected.store(0, Ordering::Relaxed);
        self.inner.failed_open.store(0, Ordering::Relaxed);
        self.inner.swept.store(0, Ordering::Relaxed);
        self.inner.resets.store(0, Ordering::Relaxed);
    }
}

/// A point-in-time snapshot of metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Requests admitted, including fail-open admissions
    pub admitted: u64,
    /// Requests rejected
    pub rejected: u64,
    /// Requests admitted because the store could not be used
    pub failed_open: u64,
    /// Window entries removed by sweeps
    pub swept: u64,
    /// Administrative resets performed
    pub resets: u64,
}

impl MetricsSnapshot {
    /// Total number of checks (admitted + rejected).
    pub fn total_checks(&self) -> u64 {
        self.admitted.saturating_add(self.rejected)
    }

    /// Ratio of rejected checks to all checks (0.0 to 1.0).
    ///
    /// Returns 0.0 if nothing has been checked.
    pub fn rejection_rate(&self) -> f64 {
        let total = self.total_checks();
        if total == 0 {
            0.0
        } else {
            self.rejected as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_initial_state() {
        let snapshot = Metrics::new().snapshot();
        assert_eq!(snapshot.total_checks(), 0);
        assert_eq!(snapshot.failed_open, 0);
        assert_eq!(snapshot.swept, 0);
    }

    #[test]
    fn test_failed_open_counts_as_admitted() {
        let metrics = Metrics::new();
        metrics.record_admitted();
        metrics.record_failed_open();

        assert_eq!(metrics.admitted(), 2);
        assert_eq!(metrics.failed_open(), 1);
    }

    #[test]
    fn test_rejection_rate() {
        let metrics = Metrics::new();
        assert_eq!(metrics.snapshot().rejection_rate(), 0.0);

        metrics.record_admitted();
        metrics.record_rejected();
        metrics.record_rejected();
        metrics.record_rejected();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_checks(), 4);
        assert!((snapshot.rejection_rate() - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_swept_and_resets() {
        let metrics = Metrics::new();
        metrics.record_swept(3);
        metrics.record_swept(0);
        metrics.record_reset();

        assert_eq!(metrics.swept(), 3);
        assert_eq!(metrics.resets(), 1);
    }

    #[test]
    fn test_reset() {
        let metrics = Metrics::new();
        metrics.record_admitted();
        metrics.record_rejected();
        metrics.record_swept(2);

        metrics.reset();
        assert_eq!(metrics.snapshot().total_checks(), 0);
        assert_eq!(metrics.swept(), 0);
    }

    #[test]
    fn test_clones_share_counters() {
        let a = Metrics::new();
        let b = a.clone();
        a.record_admitted();
        b.record_admitted();

        assert_eq!(a.admitted(), 2);
    }

    #[test]
    fn test_concurrent_updates() {
        use std::thread;

        let metrics = Metrics::new();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let m = metrics.clone();
                thread::spawn(move || {
                    for _ in 0..100 {
                        m.record_admitted();
                        m.record_rejected();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(metrics.admitted(), 800);
        assert_eq!(metrics.rejected(), 800);
    }
}
