//! Application layer - orchestration of domain logic.
//!
//! This layer coordinates the domain logic and manages the runtime behavior:
//! - Throttle (per-key decisions through a window store)
//! - Category limit table and configuration
//! - Circuit breaker and metrics around the store
//! - Sweeper (periodic removal of expired windows)
//!
//! ## Ports
//!
//! The application layer defines ports (traits) that infrastructure
//! adapters must implement. This keeps the application layer independent
//! from infrastructure details.

pub mod builder;
pub mod circuit_breaker;
pub mod config;
pub mod limits;
pub mod metrics;
pub mod ports;
pub mod throttle;

#[cfg(feature = "async")]
pub mod sweeper;
