//! Route storage.
//!
//! # Responsibilities
//! - Store method → pattern → handler mappings
//! - O(1) exact lookup of (method, pattern)
//! - Iterate a method's routes in registration order
//!
//! # Design Decisions
//! - Re-registering a (method, pattern) replaces the handler but keeps
//!   the route's original position
//! - Compiled patterns are cached per route on first use

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::routing::handler::Handler;
use crate::routing::pattern::{CompiledPattern, PatternError};

/// HTTP methods a route can be registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "get",
            Method::Post => "post",
        }
    }

    /// Map an HTTP method. Anything but GET and POST is unroutable.
    pub fn from_http(method: &axum::http::Method) -> Option<Self> {
        match *method {
            axum::http::Method::GET => Some(Method::Get),
            axum::http::Method::POST => Some(Method::Post),
            _ => None,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "get" => Ok(Method::Get),
            "post" => Ok(Method::Post),
            other => Err(format!("unsupported method '{other}'")),
        }
    }
}

/// A registered method + pattern + handler triple.
pub struct Route {
    method: Method,
    pattern: String,
    handler: Handler,
    compiled: OnceLock<Result<CompiledPattern, PatternError>>,
}

impl Route {
    fn new(method: Method, pattern: String, handler: Handler) -> Self {
        Self {
            method,
            pattern,
            handler,
            compiled: OnceLock::new(),
        }
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    /// Compiled form of the pattern, built on first call and cached.
    pub fn compiled(&self) -> Result<&CompiledPattern, PatternError> {
        self.compiled
            .get_or_init(|| CompiledPattern::compile(&self.pattern))
            .as_ref()
            .map_err(|e| e.clone())
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("pattern", &self.pattern)
            .field("handler", &self.handler)
            .finish()
    }
}

#[derive(Default)]
struct MethodRoutes {
    routes: Vec<Route>,
    index: HashMap<String, usize>,
}

/// All registered routes, grouped by method.
#[derive(Default)]
pub struct RouteTable {
    methods: HashMap<Method, MethodRoutes>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a route, replacing the handler of an existing (method, pattern).
    pub fn insert(&mut self, method: Method, pattern: impl Into<String>, handler: Handler) {
        let pattern = pattern.into();
        let entry = self.methods.entry(method).or_default();

        match entry.index.get(&pattern) {
            Some(&pos) => {
                tracing::debug!(%method, pattern = %pattern, "Route handler replaced");
                entry.routes[pos] = Route::new(method, pattern, handler);
            }
            None => {
                entry.index.insert(pattern.clone(), entry.routes.len());
                entry.routes.push(Route::new(method, pattern, handler));
            }
        }
    }

    /// Exact (method, path) lookup. No trimming, no placeholder expansion.
    pub fn exact(&self, method: Method, path: &str) -> Option<&Route> {
        let entry = self.methods.get(&method)?;
        entry.index.get(path).map(|&pos| &entry.routes[pos])
    }

    /// Routes for `method` in registration order.
    pub fn routes(&self, method: Method) -> impl Iterator<Item = &Route> {
        self.methods
            .get(&method)
            .into_iter()
            .flat_map(|entry| entry.routes.iter())
    }

    /// Every route across all methods.
    pub fn all(&self) -> impl Iterator<Item = &Route> {
        self.methods.values().flat_map(|entry| entry.routes.iter())
    }

    pub fn len(&self) -> usize {
        self.methods.values().map(|entry| entry.routes.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
