//! Builder for configuring a throttle.

use crate::application::{
    circuit_breaker::{CircuitBreaker, CircuitBreakerConfig},
    limits::LimitTable,
    ports::{Clock, WindowStore},
    throttle::Throttle,
};
use crate::domain::limits::{LimitError, WindowLimit};
use crate::infrastructure::{clock::SystemClock, memory_store::MemoryStore};
use std::fmt;
use std::sync::Arc;

/// Error returned when building a throttle with invalid configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// Category names must be non-empty
    EmptyCategory,
    /// The default category is not one of the configured categories
    UnknownDefaultCategory(String),
    /// A category limit was invalid
    Limit(LimitError),
    /// The circuit breaker must tolerate at least one failure
    ZeroFailureThreshold,
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::EmptyCategory => write!(f, "category name must not be empty"),
            BuildError::UnknownDefaultCategory(name) => {
                write!(f, "default category {:?} is not configured", name)
            }
            BuildError::Limit(e) => write!(f, "invalid limit: {}", e),
            BuildError::ZeroFailureThreshold => {
                write!(f, "circuit breaker failure_threshold must be greater than 0")
            }
        }
    }
}

impl std::error::Error for BuildError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BuildError::Limit(e) => Some(e),
            _ => None,
        }
    }
}

impl From<LimitError> for BuildError {
    fn from(e: LimitError) -> Self {
        BuildError::Limit(e)
    }
}

/// Builder for constructing a `Throttle`.
///
/// Categories are validated when `build` is called, so the builder methods
/// can be chained without intermediate error handling.
#[derive(Debug)]
pub struct ThrottleBuilder {
    limits: LimitTable,
    categories: Vec<(String, WindowLimit)>,
    default_category: Option<String>,
    clock: Option<Arc<dyn Clock>>,
    circuit_breaker: CircuitBreakerConfig,
}

impl ThrottleBuilder {
    /// Create a builder with the standard category limits.
    pub fn new() -> Self {
        Self {
            limits: LimitTable::default(),
            categories: Vec::new(),
            default_category: None,
            clock: None,
            circuit_breaker: CircuitBreakerConfig::default(),
        }
    }

    /// Replace the whole limit table.
    pub fn with_limits(mut self, limits: LimitTable) -> Self {
        self.limits = limits;
        self.categories.clear();
        self.default_category = None;
        self
    }

    /// Add or override a single category.
    pub fn with_category(mut self, name: impl Into<String>, limit: WindowLimit) -> Self {
        self.categories.push((name.into(), limit));
        self
    }

    /// Choose the category whose limit applies to unknown labels.
    pub fn with_default_category(mut self, name: impl Into<String>) -> Self {
        self.default_category = Some(name.into());
        self
    }

    /// Read time from `clock` instead of the system clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Configure the circuit breaker guarding the store.
    pub fn with_circuit_breaker(mut self, config: CircuitBreakerConfig) -> Self {
        self.circuit_breaker = config;
        self
    }

    /// Build a throttle backed by an in-memory store.
    ///
    /// # Errors
    /// Returns `BuildError` if a category name is empty, the default category
    /// is unknown, or the circuit breaker threshold is zero.
    pub fn build(self) -> Result<Throttle<MemoryStore>, BuildError> {
        self.build_with_store(MemoryStore::new())
    }

    /// Build a throttle backed by `store`.
    ///
    /// # Errors
    /// Same conditions as `build`.
    pub fn build_with_store<S>(self, store: S) -> Result<Throttle<S>, BuildError>
    where
        S: WindowStore,
    {
        if self.circuit_breaker.failure_threshold == 0 {
            return Err(BuildError::ZeroFailureThreshold);
        }

        let mut limits = self.limits;
        for (name, limit) in self.categories {
            limits = limits.with_category(name, limit)?;
        }
        if let Some(name) = self.default_category {
            limits = limits.with_default_category(name)?;
        }

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock::new()));
        let circuit_breaker = CircuitBreaker::new(self.circuit_breaker, Arc::clone(&clock));

        Ok(Throttle::from_parts(store, clock, limits, circuit_breaker))
    }
}

impl Default for ThrottleBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_default_build() {
        let throttle = ThrottleBuilder::new().build().unwrap();
        assert_eq!(throttle.limits(), &LimitTable::default());
        assert_eq!(throttle.tracked_keys(), 0);
    }

    #[test]
    fn test_custom_categories() {
        let login = WindowLimit::per_minute(5).unwrap();
        let throttle = ThrottleBuilder::new()
            .with_category("login", login)
            .with_default_category("login")
            .build()
            .unwrap();

        assert_eq!(throttle.limits().get("login"), Some(login));
        assert_eq!(throttle.limits().limit_for("other"), login);
    }

    #[test]
    fn test_empty_category_rejected() {
        let result = ThrottleBuilder::new()
            .with_category("", WindowLimit::API)
            .build();
        assert_eq!(result.unwrap_err(), BuildError::EmptyCategory);
    }

    #[test]
    fn test_unknown_default_rejected() {
        let result = ThrottleBuilder::new().with_default_category("nope").build();
        assert_eq!(
            result.unwrap_err(),
            BuildError::UnknownDefaultCategory("nope".to_string())
        );
    }

    #[test]
    fn test_zero_failure_threshold_rejected() {
        let result = ThrottleBuilder::new()
            .with_circuit_breaker(CircuitBreakerConfig {
                failure_threshold: 0,
                recovery_timeout: Duration::from_secs(1),
            })
            .build();
        assert_eq!(result.unwrap_err(), BuildError::ZeroFailureThreshold);
    }

    #[test]
    fn test_with_limits_replaces_table() {
        let table = LimitTable::new("only", WindowLimit::per_hour(10).unwrap()).unwrap();
        let throttle = ThrottleBuilder::new()
            .with_category("discarded", WindowLimit::API)
            .with_limits(table.clone())
            .build()
            .unwrap();

        assert_eq!(throttle.limits(), &table);
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            BuildError::from(LimitError::ZeroWindow).to_string(),
            "invalid limit: window must be greater than 0"
        );
        assert_eq!(
            BuildError::UnknownDefaultCategory("x".into()).to_string(),
            "default category \"x\" is not configured"
        );
    }
}
