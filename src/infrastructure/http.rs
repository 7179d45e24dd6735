//! axum middleware that throttles requests per client IP and path category.
//!
//! The throttle itself knows nothing about HTTP. This adapter derives the
//! identifier from the request (client IP), the category from the path, and
//! turns a rejection into `429 Too Many Requests`.
//!
//! ```rust,ignore
//! use axum::{middleware, routing::get, Router};
//! use request_throttle::{HttpThrottle, Throttle};
//! use request_throttle::infrastructure::http::throttle_middleware;
//!
//! let throttle = Throttle::builder().build().unwrap();
//! let state = HttpThrottle::new(throttle);
//!
//! let app: Router = Router::new()
//!     .route("/api/search", get(|| async { "results" }))
//!     .layer(middleware::from_fn_with_state(state, throttle_middleware));
//! ```
//!
//! Serve with `into_make_service_with_connect_info::<SocketAddr>()` so the
//! socket peer is available when no proxy header is present.

use crate::application::{ports::WindowStore, throttle::Throttle};
use crate::domain::limits::{ADMIN_CATEGORY, API_CATEGORY, AUTH_CATEGORY, SEARCH_CATEGORY};
use crate::domain::window::Decision;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// `X-RateLimit-Limit` response header.
pub const RATE_LIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
/// `X-RateLimit-Remaining` response header.
pub const RATE_LIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");

const FALLBACK_IP: &str = "127.0.0.1";

/// Headers consulted for the client address, most trusted first.
const CLIENT_IP_HEADERS: [&str; 3] = ["x-forwarded-for", "x-real-ip", "cf-connecting-ip"];

/// Determine the client address of a request.
///
/// Uses the first entry of `X-Forwarded-For`, then `X-Real-IP`, then
/// `CF-Connecting-IP`, then the socket peer, and finally `127.0.0.1`.
/// Headers are only trustworthy behind a proxy that overwrites them.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    CLIENT_IP_HEADERS
        .iter()
        .find_map(|name| {
            let value = headers.get(*name)?.to_str().ok()?;
            let first = value.split(',').next()?.trim();
            (!first.is_empty()).then(|| normalize(first))
        })
        .or_else(|| peer.map(|addr| addr.ip().to_canonical().to_string()))
        .unwrap_or_else(|| FALLBACK_IP.to_string())
}

fn normalize(value: &str) -> String {
    match value.parse::<IpAddr>() {
        Ok(ip) => ip.to_canonical().to_string(),
        Err(_) => value.to_string(),
    }
}

/// Ordered path-prefix rules mapping a request path to a category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathCategories {
    rules: Vec<(String, String)>,
    fallback: String,
}

impl PathCategories {
    /// No rules; every path maps to `fallback`.
    pub fn new(fallback: impl Into<String>) -> Self {
        Self {
            rules: Vec::new(),
            fallback: fallback.into(),
        }
    }

    /// Append a rule. Earlier rules win.
    pub fn with_rule(mut self, prefix: impl Into<String>, category: impl Into<String>) -> Self {
        self.rules.push((prefix.into(), category.into()));
        self
    }

    /// Category for `path`.
    pub fn classify(&self, path: &str) -> &str {
        self.rules
            .iter()
            .find(|(prefix, _)| path.starts_with(prefix.as_str()))
            .map(|(_, category)| category.as_str())
            .unwrap_or(&self.fallback)
    }
}

impl Default for PathCategories {
    /// `/api/search` → search, `/api/admin/auth` → auth, `/api/admin` → admin,
    /// anything else → api.
    fn default() -> Self {
        Self::new(API_CATEGORY)
            .with_rule("/api/search", SEARCH_CATEGORY)
            .with_rule("/api/admin/auth", AUTH_CATEGORY)
            .with_rule("/api/admin", ADMIN_CATEGORY)
    }
}

/// Middleware state: the throttle plus the path classification.
pub struct HttpThrottle<S>
where
    S: WindowStore,
{
    throttle: Throttle<S>,
    categories: PathCategories,
}

impl<S> HttpThrottle<S>
where
    S: WindowStore,
{
    /// Use the default path categories.
    pub fn new(throttle: Throttle<S>) -> Self {
        Self {
            throttle,
            categories: PathCategories::default(),
        }
    }

    /// Replace the path categories.
    pub fn with_categories(mut self, categories: PathCategories) -> Self {
        self.categories = categories;
        self
    }

    /// The wrapped throttle.
    pub fn throttle(&self) -> &Throttle<S> {
        &self.throttle
    }

    /// The path classification.
    pub fn categories(&self) -> &PathCategories {
        &self.categories
    }
}

impl<S> Clone for HttpThrottle<S>
where
    S: WindowStore,
{
    fn clone(&self) -> Self {
        Self {
            throttle: self.throttle.clone(),
            categories: self.categories.clone(),
        }
    }
}

impl<S> std::fmt::Debug for HttpThrottle<S>
where
    S: WindowStore,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpThrottle")
            .field("throttle", &self.throttle)
            .field("categories", &self.categories)
            .finish()
    }
}

/// Whole seconds to wait, rounded up, at least 1.
fn retry_after_secs(retry_after: Duration) -> u64 {
    let millis = retry_after.as_millis().min(u128::from(u64::MAX)) as u64;
    millis.div_ceil(1000).max(1)
}

/// Throttle middleware for `axum::middleware::from_fn_with_state`.
pub async fn throttle_middleware<S>(
    State(state): State<HttpThrottle<S>>,
    request: Request,
    next: Next,
) -> Response
where
    S: WindowStore + 'static,
{
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let ip = client_ip(request.headers(), peer);

    let category = state.categories.classify(request.uri().path());
    let limit = state.throttle.limits().limit_for(category);
    let decision = state.throttle.check_limit(&ip, category, limit);

    match decision {
        Decision::Admitted { remaining } => {
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            headers.insert(RATE_LIMIT_LIMIT, HeaderValue::from(limit.limit()));
            headers.insert(RATE_LIMIT_REMAINING, HeaderValue::from(remaining));
            response
        }
        Decision::Rejected { retry_after } => {
            tracing::info!(
                client = %ip,
                category,
                path = %request.uri().path(),
                "rate limit exceeded"
            );

            let mut response = (StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded").into_response();
            let headers = response.headers_mut();
            headers.insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs(retry_after)));
            headers.insert(RATE_LIMIT_LIMIT, HeaderValue::from(limit.limit()));
            headers.insert(RATE_LIMIT_REMAINING, HeaderValue::from(0u32));
            response
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_forwarded_for_first_entry() {
        let h = headers(&[
            ("x-forwarded-for", " 203.0.113.7 , 10.0.0.1"),
            ("x-real-ip", "198.51.100.2"),
        ]);
        assert_eq!(client_ip(&h, None), "203.0.113.7");
    }

    #[test]
    fn test_header_precedence() {
        let h = headers(&[("x-real-ip", "198.51.100.2"), ("cf-connecting-ip", "192.0.2.9")]);
        assert_eq!(client_ip(&h, None), "198.51.100.2");

        let h = headers(&[("cf-connecting-ip", "192.0.2.9")]);
        assert_eq!(client_ip(&h, None), "192.0.2.9");
    }

    #[test]
    fn test_empty_header_falls_through() {
        let h = headers(&[("x-forwarded-for", " , 10.0.0.1"), ("x-real-ip", "198.51.100.2")]);
        assert_eq!(client_ip(&h, None), "198.51.100.2");
    }

    #[test]
    fn test_peer_and_fallback() {
        let peer: SocketAddr = "192.0.2.1:5555".parse().unwrap();
        assert_eq!(client_ip(&HeaderMap::new(), Some(peer)), "192.0.2.1");
        assert_eq!(client_ip(&HeaderMap::new(), None), "127.0.0.1");
    }

    #[test]
    fn test_ipv4_mapped_normalized() {
        let peer: SocketAddr = "[::ffff:192.0.2.1]:80".parse().unwrap();
        assert_eq!(client_ip(&HeaderMap::new(), Some(peer)), "192.0.2.1");

        let h = headers(&[("x-real-ip", "::ffff:198.51.100.2")]);
        assert_eq!(client_ip(&h, None), "198.51.100.2");
    }

    #[test]
    fn test_default_path_categories() {
        let categories = PathCategories::default();
        assert_eq!(categories.classify("/api/search?q=main+st"), "search");
        assert_eq!(categories.classify("/api/search/suggest"), "search");
        assert_eq!(categories.classify("/api/admin/users"), "admin");
        assert_eq!(categories.classify("/api/admin/auth"), "auth");
        assert_eq!(categories.classify("/api/listings"), "api");
        assert_eq!(categories.classify("/about"), "api");
    }

    #[test]
    fn test_custom_rules_first_match_wins() {
        let categories = PathCategories::new("general")
            .with_rule("/login", "login")
            .with_rule("/log", "logs");
        assert_eq!(categories.classify("/login"), "login");
        assert_eq!(categories.classify("/logs/today"), "logs");
        assert_eq!(categories.classify("/"), "general");
    }

    #[test]
    fn test_retry_after_rounding() {
        assert_eq!(retry_after_secs(Duration::ZERO), 1);
        assert_eq!(retry_after_secs(Duration::from_millis(700)), 1);
        assert_eq!(retry_after_secs(Duration::from_millis(1001)), 2);
        assert_eq!(retry_after_secs(Duration::from_secs(3600)), 3600);
    }
}
