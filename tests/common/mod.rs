//! Shared helpers for integration tests.

#![allow(dead_code)]

use request_throttle::infrastructure::mocks::MockClock;
use request_throttle::{MemoryStore, Throttle};
use std::sync::Arc;

/// In-memory throttle with the standard limits, driven by `clock`.
pub fn throttle_with(clock: &MockClock) -> Throttle<MemoryStore> {
    Throttle::builder()
        .with_clock(Arc::new(clock.clone()))
        .build()
        .unwrap()
}
