//! Request classification — which caching discipline serves a request.
//!
//! Classification is a pure, total function over the request path and the
//! configured API prefixes: every request routes to exactly one
//! [`StrategyKind`], deterministically. Paths under an API prefix get
//! Network-First (fresh data preferred, cache as a fallback); everything
//! else gets Cache-First (assets are immutable within a generation).

use crate::http::Request;

/// The two caching disciplines a request can be routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    /// Prefer a live network response; fall back to cache only on failure.
    NetworkFirst,
    /// Prefer a stored response; only hit the network on a miss.
    CacheFirst,
}

/// Classifies intercepted requests by path prefix.
///
/// # Examples
///
/// ```
/// use offcache::http::Request;
/// use offcache::router::{StrategyKind, StrategyRouter};
///
/// let router = StrategyRouter::default();
/// assert_eq!(router.route(&Request::get("/api/cases")), StrategyKind::NetworkFirst);
/// assert_eq!(router.route(&Request::get("/index.html")), StrategyKind::CacheFirst);
/// ```
#[derive(Debug, Clone)]
pub struct StrategyRouter {
    api_prefixes: Vec<String>,
}

impl StrategyRouter {
    /// Builds a router for the given API path prefixes.
    ///
    /// A prefix matches the exact path (`/api`) as well as everything below
    /// it (`/api/...`); a trailing slash on a configured prefix is folded so
    /// `/api/` and `/api` behave identically.
    pub fn new<I, S>(api_prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let api_prefixes = api_prefixes
            .into_iter()
            .map(|prefix| {
                let prefix = prefix.into();
                match prefix.strip_suffix('/') {
                    Some(stripped) if !stripped.is_empty() => stripped.to_owned(),
                    _ => prefix,
                }
            })
            .collect();
        Self { api_prefixes }
    }

    /// Picks the strategy for a request. Total: no request is unroutable.
    pub fn route(&self, request: &Request) -> StrategyKind {
        if self.is_api_path(request.path()) {
            StrategyKind::NetworkFirst
        } else {
            StrategyKind::CacheFirst
        }
    }

    fn is_api_path(&self, path: &str) -> bool {
        self.api_prefixes.iter().any(|prefix| {
            path == prefix
                || path
                    .strip_prefix(prefix.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }
}

impl Default for StrategyRouter {
    /// Routes everything under `/api/` to Network-First.
    fn default() -> Self {
        Self::new(["/api"])
    }
}
