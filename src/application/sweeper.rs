//! Background removal of expired windows.
//!
//! Without a sweep, every distinct client ever seen keeps an entry in the
//! in-memory store. The sweeper runs `Throttle::sweep` on a fixed interval
//! inside a tokio task.
//!
//! The task is stopped only by `SweeperHandle::shutdown`. Dropping the handle
//! detaches the task and it keeps running for the life of the runtime.

use crate::application::{ports::WindowStore, throttle::Throttle};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Error returned when sweeper configuration validation fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SweeperConfigError {
    /// Sweep interval duration must be greater than zero
    ZeroInterval,
}

impl std::fmt::Display for SweeperConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SweeperConfigError::ZeroInterval => write!(f, "sweep interval must be greater than 0"),
        }
    }
}

impl std::error::Error for SweeperConfigError {}

/// Error returned by `SweeperHandle::shutdown`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownError {
    /// The sweep task panicked before it could be stopped
    TaskPanicked,
    /// The sweep task was cancelled, e.g. because the runtime shut down
    TaskCancelled,
}

impl std::fmt::Display for ShutdownError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShutdownError::TaskPanicked => write!(f, "sweeper task panicked"),
            ShutdownError::TaskCancelled => write!(f, "sweeper task was cancelled"),
        }
    }
}

impl std::error::Error for ShutdownError {}

/// How often to sweep and what counts as stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweeperConfig {
    /// Time between sweeps
    pub interval: Duration,
    /// How long past its end a window is kept
    pub max_age: Duration,
}

impl Default for SweeperConfig {
    /// Every 5 minutes, dropping anything whose window has ended.
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5 * 60),
            max_age: Duration::ZERO,
        }
    }
}

impl SweeperConfig {
    /// Create a validated config.
    ///
    /// # Errors
    /// Returns `SweeperConfigError::ZeroInterval` if `interval` is zero.
    pub fn new(interval: Duration, max_age: Duration) -> Result<Self, SweeperConfigError> {
        if interval.is_zero() {
            return Err(SweeperConfigError::ZeroInterval);
        }
        Ok(Self { interval, max_age })
    }
}

/// Periodically sweeps a throttle's store.
pub struct Sweeper<S>
where
    S: WindowStore,
{
    throttle: Throttle<S>,
    config: SweeperConfig,
}

impl<S> Sweeper<S>
where
    S: WindowStore + 'static,
{
    /// Create a sweeper for `throttle`.
    pub fn new(throttle: Throttle<S>, config: SweeperConfig) -> Self {
        Self { throttle, config }
    }

    /// Run one sweep now.
    pub fn sweep_once(&self) -> usize {
        self.throttle.sweep(self.config.max_age)
    }

    /// Get the sweeper configuration.
    pub fn config(&self) -> &SweeperConfig {
        &self.config
    }

    /// Spawn the sweep loop on the current tokio runtime.
    ///
    /// The first sweep happens one `interval` after starting.
    ///
    /// # Panics
    /// Panics if called outside a tokio runtime.
    pub fn start(self) -> SweeperHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut ticker = interval(self.config.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;

            let mut listening = true;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = self.sweep_once();
                        tracing::debug!(removed, "sweep tick");
                    }
                    changed = shutdown_rx.changed(), if listening => match changed {
                        Ok(()) if *shutdown_rx.borrow() => break,
                        Ok(()) => {}
                        // Handle dropped without shutdown: keep sweeping
                        Err(_) => listening = false,
                    },
                }
            }

            tracing::debug!("sweeper stopped");
        });

        SweeperHandle { shutdown_tx, task }
    }
}

/// Handle to a running sweep task.
#[derive(Debug)]
pub struct SweeperHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Stop the sweep loop and wait for the task to finish.
    ///
    /// # Errors
    /// Returns `ShutdownError` if the task panicked or was cancelled.
    pub async fn shutdown(self) -> Result<(), ShutdownError> {
        // A send error means the task is already gone; the join reports why.
        let _ = self.shutdown_tx.send(true);
        self.task.await.map_err(|e| {
            if e.is_panic() {
                ShutdownError::TaskPanicked
            } else {
                ShutdownError::TaskCancelled
            }
        })
    }

    /// Whether the task has finished.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Abort the task without waiting.
    pub fn abort(&self) {
        self.task.abort();
    }
}

impl<S> Throttle<S>
where
    S: WindowStore + 'static,
{
    /// Start a background sweeper for this throttle.
    ///
    /// # Panics
    /// Panics if called outside a tokio runtime.
    pub fn start_sweeper(&self, config: SweeperConfig) -> SweeperHandle {
        Sweeper::new(self.clone(), config).start()
    }
}
