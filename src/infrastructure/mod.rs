//! Infrastructure layer - external adapters and integrations.
//!
//! This layer provides adapters for:
//! - Clock abstraction (system time vs mock)
//! - Window stores (sharded in-memory map, Redis)
//! - HTTP integration (axum middleware)

pub mod clock;
pub mod memory_store;

#[cfg(feature = "redis-storage")]
pub mod redis_store;

#[cfg(feature = "axum")]
pub mod http;

/// Mock implementations for testing.
///
/// This module is only available when the `test-helpers` feature is enabled,
/// or during test builds. It provides controllable test doubles for testing
/// throttling behavior.
///
/// This crate's own `tests/` enable it through a dev-dependency on itself:
/// ```toml
/// [dev-dependencies]
/// request-throttle = { path = ".", features = ["test-helpers"] }
/// ```
#[cfg(any(test, feature = "test-helpers"))]
pub mod mocks;
