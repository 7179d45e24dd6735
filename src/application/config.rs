//! Serializable throttle configuration.
//!
//! `ThrottleConfig` is what an application loads from its config file. It is
//! plain data; `limit_table()` and `builder()` validate it.

use crate::application::{
    builder::{BuildError, ThrottleBuilder},
    circuit_breaker::CircuitBreakerConfig,
    limits::LimitTable,
};
use crate::domain::limits::WindowLimit;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

#[cfg(feature = "async")]
use crate::application::sweeper::{SweeperConfig, SweeperConfigError};

/// Limit for one category, in config-file units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitConfig {
    /// Maximum admissions per window
    pub limit: u32,
    /// Window length in milliseconds
    pub window_ms: u64,
}

impl LimitConfig {
    /// Validate into a `WindowLimit`.
    pub fn to_limit(&self) -> Result<WindowLimit, BuildError> {
        Ok(WindowLimit::new(self.limit, Duration::from_millis(self.window_ms))?)
    }
}

impl From<WindowLimit> for LimitConfig {
    fn from(limit: WindowLimit) -> Self {
        Self {
            limit: limit.limit(),
            window_ms: limit.window().as_millis() as u64,
        }
    }
}

/// Throttle configuration as loaded from a file or environment.
///
/// Missing fields take their default values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrottleConfig {
    /// Category name → limit
    pub categories: BTreeMap<String, LimitConfig>,
    /// Category whose limit applies to unknown labels
    pub default_category: String,
    /// How often the background sweeper runs
    pub sweep_interval_ms: u64,
    /// How long past its end a window is kept before being swept
    pub sweep_max_age_ms: u64,
    /// Consecutive store failures before the circuit opens
    pub failure_threshold: u32,
    /// How long the circuit stays open before probing the store
    pub recovery_timeout_ms: u64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        let table = LimitTable::default();
        let breaker = CircuitBreakerConfig::default();
        Self {
            categories: table
                .categories()
                .map(|(name, limit)| (name.to_string(), LimitConfig::from(limit)))
                .collect(),
            default_category: table.default_category().to_string(),
            sweep_interval_ms: 5 * 60 * 1000,
            sweep_max_age_ms: 0,
            failure_threshold: breaker.failure_threshold,
            recovery_timeout_ms: breaker.recovery_timeout.as_millis() as u64,
        }
    }
}

impl ThrottleConfig {
    /// Validate the categories into a `LimitTable`.
    ///
    /// # Errors
    /// Returns `BuildError` if a limit is zero, a name is empty, or
    /// `default_category` is not among `categories`.
    pub fn limit_table(&self) -> Result<LimitTable, BuildError> {
        let default = self
            .categories
            .get(&self.default_category)
            .ok_or_else(|| BuildError::UnknownDefaultCategory(self.default_category.clone()))?;

        let mut table = LimitTable::new(self.default_category.clone(), default.to_limit()?)?;
        for (name, limit) in &self.categories {
            table = table.with_category(name.clone(), limit.to_limit()?)?;
        }
        Ok(table)
    }

    /// Circuit breaker settings.
    pub fn circuit_breaker_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: self.failure_threshold,
            recovery_timeout: Duration::from_millis(self.recovery_timeout_ms),
        }
    }

    /// Sweeper schedule.
    ///
    /// # Errors
    /// Returns `SweeperConfigError::ZeroInterval` if `sweep_interval_ms` is 0.
    #[cfg(feature = "async")]
    pub fn sweeper_config(&self) -> Result<SweeperConfig, SweeperConfigError> {
        SweeperConfig::new(
            Duration::from_millis(self.sweep_interval_ms),
            Duration::from_millis(self.sweep_max_age_ms),
        )
    }

    /// A builder preloaded with this configuration.
    pub fn builder(&self) -> Result<ThrottleBuilder, BuildError> {
        Ok(ThrottleBuilder::new()
            .with_limits(self.limit_table()?)
            .with_circuit_breaker(self.circuit_breaker_config()))
    }
}
