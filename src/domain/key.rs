//! Throttle keys.
//!
//! A throttle key identifies one independent counting window. It combines:
//! - The client identifier (normally a normalized IP address)
//! - The endpoint category label (`search`, `api`, `admin`, ...)
//!
//! Two requests share a window only if both parts are equal.

use std::fmt;

/// The `(identifier, category)` pair identifying one counter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ThrottleKey {
    identifier: String,
    category: String,
}

impl ThrottleKey {
    /// Create a key from a client identifier and a category label.
    pub fn new(identifier: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            category: category.into(),
        }
    }

    /// Parse the `identifier:category` form produced by `Display`.
    ///
    /// Splits on the last `:` so IPv6 identifiers keep their colons.
    /// Returns `None` when there is no separator or either side is empty.
    pub fn parse(raw: &str) -> Option<Self> {
        let (identifier, category) = raw.rsplit_once(':')?;
        if identifier.is_empty() || category.is_empty() {
            return None;
        }
        Some(Self::new(identifier, category))
    }

    /// The client identifier.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// The endpoint category.
    pub fn category(&self) -> &str {
        &self.category
    }
}

impl fmt::Display for ThrottleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.identifier, self.category)
    }
}
