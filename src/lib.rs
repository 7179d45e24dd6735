//! # request-throttle
//!
//! Fixed-window request throttling per client and endpoint category.
//!
//! Every request is identified by a key of two parts: who is asking (usually
//! the client IP) and what they are asking for (a category such as `search`
//! or `admin`). Each key may be admitted at most `limit` times per fixed
//! window; further requests are rejected with the time left until the window
//! ends.
//!
//! ## Quick Start
//!
//! ```rust
//! use request_throttle::{Decision, Throttle};
//! use std::time::Duration;
//!
//! let throttle = Throttle::builder().build().unwrap();
//!
//! // Explicit limit: 3 requests per second
//! for _ in 0..3 {
//!     assert!(throttle.check("203.0.113.7", "search", 3, Duration::from_secs(1)).is_admitted());
//! }
//! match throttle.check("203.0.113.7", "search", 3, Duration::from_secs(1)) {
//!     Decision::Rejected { retry_after } => assert!(retry_after <= Duration::from_secs(1)),
//!     Decision::Admitted { .. } => unreachable!(),
//! }
//!
//! // Limits from the category table (search 100/h, api 1000/h, admin 200/h, auth 5/15 min)
//! assert_eq!(throttle.check_category("198.51.100.2", "admin").remaining(), 199);
//! ```
//!
//! ## Features
//!
//! ### Fixed windows
//! - The first request for a key opens a window and counts as 1
//! - A window elapses when strictly more than `window` has passed since it
//!   opened; the next request opens a fresh window
//! - Rejections never change stored state
//! - Up to `2 * limit` requests can be admitted across a window boundary; this
//!   is inherent to fixed windows
//!
//! ### Stores
//! - **In-memory** (`MemoryStore`): sharded `DashMap`, per-key atomic updates
//! - **Redis** (`RedisStore`, feature `redis-storage`): shared across instances,
//!   atomic Lua update, server-side TTL
//!
//! ### Operations
//! - **Fail-open**: store errors admit the request, are logged, and trip a
//!   circuit breaker so a dead store is not hammered
//! - **Sweeper** (feature `async`): background task removing expired windows,
//!   with explicit `shutdown()`
//! - **Metrics**: admitted, rejected, failed-open, swept, reset counters
//! - **HTTP** (feature `axum`): middleware deriving the client IP and category
//!   from the request and answering `429 Too Many Requests`
//!
//! ## Memory Management
//!
//! The in-memory store holds one entry per active key, roughly 100 bytes plus
//! the identifier and category strings. Entries are not evicted on the request
//! path; run the sweeper (or call `Throttle::sweep`) to bound memory:
//!
//! ```rust,no_run
//! # #[cfg(feature = "async")]
//! # async fn run() {
//! use request_throttle::{SweeperConfig, Throttle};
//!
//! let throttle = Throttle::builder().build().unwrap();
//! let sweeper = throttle.start_sweeper(SweeperConfig::default());
//!
//! // ... serve requests ...
//!
//! sweeper.shutdown().await.expect("shutdown failed");
//! # }
//! ```
//!
//! Dropping the `SweeperHandle` without calling `shutdown()` leaves the sweep
//! task running.
//!
//! ## Configuration
//!
//! `ThrottleConfig` is serde-deserializable; missing fields take defaults:
//!
//! ```rust
//! use request_throttle::ThrottleConfig;
//!
//! let json = r#"{ "categories": { "api": { "limit": 60, "window_ms": 60000 } } }"#;
//! let config: ThrottleConfig = serde_json::from_str(json).unwrap();
//! let throttle = config.builder().unwrap().build().unwrap();
//! assert_eq!(throttle.limits().default_category(), "api");
//! ```

// Domain layer - pure business logic
pub mod domain;

// Application layer - orchestration
pub mod application;

// Infrastructure layer - external adapters
pub mod infrastructure;

// Re-export commonly used types for convenience
pub use domain::{
    key::ThrottleKey,
    limits::{
        LimitError, WindowLimit, ADMIN_CATEGORY, API_CATEGORY, AUTH_CATEGORY, SEARCH_CATEGORY,
    },
    window::{Decision, WindowState},
};

pub use application::{
    builder::{BuildError, ThrottleBuilder},
    circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState},
    config::{LimitConfig, ThrottleConfig},
    limits::LimitTable,
    metrics::{Metrics, MetricsSnapshot},
    ports::{Clock, StoreError, WindowStore},
    throttle::Throttle,
};

#[cfg(feature = "async")]
pub use application::sweeper::{
    ShutdownError, Sweeper, SweeperConfig, SweeperConfigError, SweeperHandle,
};

pub use infrastructure::{clock::SystemClock, memory_store::MemoryStore};

#[cfg(feature = "redis-storage")]
pub use infrastructure::redis_store::{RedisStore, RedisStoreConfig};

#[cfg(feature = "axum")]
pub use infrastructure::http::{client_ip, throttle_middleware, HttpThrottle, PathCategories};
