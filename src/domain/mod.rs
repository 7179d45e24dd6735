//! Domain layer - pure throttling logic with no external dependencies.
//!
//! This layer contains the core concepts and invariants of the throttle:
//! - Throttle keys (client identifier + endpoint category)
//! - Window limits and the built-in category constants
//! - The fixed-window counting rule and its decisions
//!
//! Nothing here reads a clock or touches shared state; callers pass `now` in.

pub mod key;
pub mod limits;
pub mod window;
