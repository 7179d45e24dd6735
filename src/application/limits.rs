//! Per-category limit table.
//!
//! Every endpoint category is throttled with its own `WindowLimit`. Labels the
//! table does not know take the default category's limit, so a misspelt or new
//! route is still counted rather than let through unthrottled. They keep their
//! own windows.

use crate::application::builder::BuildError;
use crate::domain::limits::{
    WindowLimit, ADMIN_CATEGORY, API_CATEGORY, AUTH_CATEGORY, SEARCH_CATEGORY,
};
use std::collections::BTreeMap;

/// Category → limit mapping with a default category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimitTable {
    limits: BTreeMap<String, WindowLimit>,
    default_category: String,
}

impl LimitTable {
    /// Create a table holding only the default category.
    ///
    /// # Errors
    /// Returns `BuildError::EmptyCategory` if `default_category` is empty.
    pub fn new(default_category: impl Into<String>, limit: WindowLimit) -> Result<Self, BuildError> {
        let default_category = default_category.into();
        if default_category.is_empty() {
            return Err(BuildError::EmptyCategory);
        }
        let mut limits = BTreeMap::new();
        limits.insert(default_category.clone(), limit);
        Ok(Self {
            limits,
            default_category,
        })
    }

    /// Add or replace a category.
    ///
    /// # Errors
    /// Returns `BuildError::EmptyCategory` if `name` is empty.
    pub fn with_category(
        mut self,
        name: impl Into<String>,
        limit: WindowLimit,
    ) -> Result<Self, BuildError> {
        let name = name.into();
        if name.is_empty() {
            return Err(BuildError::EmptyCategory);
        }
        self.limits.insert(name, limit);
        Ok(self)
    }

    /// Choose which existing category unknown labels fall back to.
    ///
    /// # Errors
    /// Returns `BuildError::UnknownDefaultCategory` if `name` is not in the table.
    pub fn with_default_category(mut self, name: impl Into<String>) -> Result<Self, BuildError> {
        let name = name.into();
        if !self.limits.contains_key(&name) {
            return Err(BuildError::UnknownDefaultCategory(name));
        }
        self.default_category = name;
        Ok(self)
    }

    /// Limit configured for exactly `name`.
    pub fn get(&self, name: &str) -> Option<WindowLimit> {
        self.limits.get(name).copied()
    }

    /// Limit for `name`, falling back to the default category's limit.
    pub fn limit_for(&self, name: &str) -> WindowLimit {
        self.get(name).unwrap_or_else(|| self.default_limit())
    }

    /// The fallback category.
    pub fn default_category(&self) -> &str {
        &self.default_category
    }

    fn default_limit(&self) -> WindowLimit {
        // The default category is always present: `new` inserts it, and
        // `with_default_category` only accepts existing names.
        self.limits
            .get(&self.default_category)
            .copied()
            .unwrap_or(WindowLimit::API)
    }

    /// Iterate over `(category, limit)` pairs in name order.
    pub fn categories(&self) -> impl Iterator<Item = (&str, WindowLimit)> {
        self.limits.iter().map(|(name, limit)| (name.as_str(), *limit))
    }

    /// Number of configured categories.
    pub fn len(&self) -> usize {
        self.limits.len()
    }

    /// Always false: the default category is always present.
    pub fn is_empty(&self) -> bool {
        self.limits.is_empty()
    }
}

impl Default for LimitTable {
    /// search 100/h, api 1000/h, admin 200/h, auth 5 per 15 min; unknown
    /// labels get the `api` limit.
    fn default() -> Self {
        let mut limits = BTreeMap::new();
        limits.insert(SEARCH_CATEGORY.to_string(), WindowLimit::SEARCH);
        limits.insert(API_CATEGORY.to_string(), WindowLimit::API);
        limits.insert(ADMIN_CATEGORY.to_string(), WindowLimit::ADMIN);
        limits.insert(AUTH_CATEGORY.to_string(), WindowLimit::AUTH);
        Self {
            limits,
            default_category: API_CATEGORY.to_string(),
        }
    }
}
