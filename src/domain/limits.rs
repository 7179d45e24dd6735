//! Window limits.
//!
//! A `WindowLimit` is the pair of constants that configures one category:
//! how many requests are admitted, and over how long a window.

use std::time::Duration;

/// Category used for address lookups.
pub const SEARCH_CATEGORY: &str = "search";
/// Category used for general API routes, and for anything unclassified.
pub const API_CATEGORY: &str = "api";
/// Category used for the admin surface.
pub const ADMIN_CATEGORY: &str = "admin";
/// Category used for login attempts.
pub const AUTH_CATEGORY: &str = "auth";

const HOUR: Duration = Duration::from_secs(60 * 60);

/// Error returned when a limit fails validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitError {
    /// The request limit must be greater than zero
    ZeroLimit,
    /// The window length must be greater than zero
    ZeroWindow,
}

impl std::fmt::Display for LimitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LimitError::ZeroLimit => write!(f, "limit must be greater than 0"),
            LimitError::ZeroWindow => write!(f, "window must be greater than 0"),
        }
    }
}

impl std::error::Error for LimitError {}

/// Maximum admissions per fixed window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowLimit {
    limit: u32,
    window: Duration,
}

impl WindowLimit {
    /// 100 searches per hour.
    pub const SEARCH: WindowLimit = WindowLimit {
        limit: 100,
        window: HOUR,
    };

    /// 1000 API requests per hour.
    pub const API: WindowLimit = WindowLimit {
        limit: 1000,
        window: HOUR,
    };

    /// 200 admin requests per hour.
    pub const ADMIN: WindowLimit = WindowLimit {
        limit: 200,
        window: HOUR,
    };

    /// 5 login attempts per 15 minutes.
    pub const AUTH: WindowLimit = WindowLimit {
        limit: 5,
        window: Duration::from_secs(15 * 60),
    };

    /// Create a validated limit.
    ///
    /// # Errors
    /// Returns `LimitError::ZeroLimit` if `limit` is zero and
    /// `LimitError::ZeroWindow` if `window` is zero.
    pub fn new(limit: u32, window: Duration) -> Result<Self, LimitError> {
        if limit == 0 {
            return Err(LimitError::ZeroLimit);
        }
        if window.is_zero() {
            return Err(LimitError::ZeroWindow);
        }
        Ok(Self { limit, window })
    }

    /// `limit` requests per hour.
    pub fn per_hour(limit: u32) -> Result<Self, LimitError> {
        Self::new(limit, HOUR)
    }

    /// `limit` requests per minute.
    pub fn per_minute(limit: u32) -> Result<Self, LimitError> {
        Self::new(limit, Duration::from_secs(60))
    }

    /// Maximum admissions per window.
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Window length.
    pub fn window(&self) -> Duration {
        self.window
    }
}
