//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Register routes for GET and POST
//! - Resolve (method, path): exact lookup first, then pattern scan
//! - Populate route params, run controller middleware, invoke the handler
//!
//! # Design Decisions
//! - Exact lookup is O(1) and never touches the pattern compiler
//! - Pattern scan follows registration order; first match wins, no
//!   specificity ranking
//! - Middleware errors are not caught here; they abort dispatch
//! - Explicit NotFound rather than silent default

use crate::app::{ActiveController, RequestContext};
use crate::error::AppError;
use crate::http::response::Response;
use crate::mvc::view::ViewParams;
use crate::routing::handler::{ActionRef, Handler};
use crate::routing::pattern::{trim_slashes, PatternError, RouteParams};
use crate::routing::table::{Method, Route, RouteTable};

/// A resolved route plus the parameters extracted from the path.
#[derive(Debug)]
pub struct RouteMatch<'r> {
    pub route: &'r Route,
    pub params: RouteParams,
    /// True when found by exact lookup rather than pattern scan.
    pub exact: bool,
}

/// Request router. Built at boot, immutable once the application is built.
#[derive(Default)]
pub struct Router {
    table: RouteTable,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a GET route.
    pub fn get(&mut self, pattern: impl Into<String>, handler: Handler) -> &mut Self {
        self.register(Method::Get, pattern, handler)
    }

    /// Register a POST route.
    pub fn post(&mut self, pattern: impl Into<String>, handler: Handler) -> &mut Self {
        self.register(Method::Post, pattern, handler)
    }

    /// Insert or overwrite a route. The pattern is not validated here.
    pub fn register(
        &mut self,
        method: Method,
        pattern: impl Into<String>,
        handler: Handler,
    ) -> &mut Self {
        self.table.insert(method, pattern, handler);
        self
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    /// Compile every route pattern now instead of on first match.
    /// Returns the number of routes compiled.
    pub fn compile_all(&self) -> Result<usize, PatternError> {
        let mut compiled = 0;
        for route in self.table.all() {
            if trim_slashes(route.pattern()).is_empty() {
                continue;
            }
            route.compiled()?;
            compiled += 1;
        }
        Ok(compiled)
    }

    /// Find the route for (method, path) without dispatching.
    pub fn match_route(
        &self,
        method: Method,
        path: &str,
    ) -> Result<Option<RouteMatch<'_>>, PatternError> {
        if let Some(route) = self.table.exact(method, path) {
            return Ok(Some(RouteMatch {
                route,
                params: RouteParams::new(),
                exact: true,
            }));
        }

        for route in self.table.routes(method) {
            // A root pattern is only reachable through the exact lookup.
            if trim_slashes(route.pattern()).is_empty() {
                continue;
            }
            if let Some(params) = route.compiled()?.captures(path) {
                return Ok(Some(RouteMatch {
                    route,
                    params,
                    exact: false,
                }));
            }
        }

        Ok(None)
    }

    /// Resolve the context's request and run its handler.
    pub fn resolve(&self, ctx: &mut RequestContext<'_>) -> Result<Response, AppError> {
        let method = ctx.request.method();
        let path = ctx.request.path().to_string();

        let matched = match self.match_route(method, &path)? {
            Some(m) => m,
            None => {
                tracing::debug!(%method, path = %path, "No route matched");
                return Err(AppError::not_found());
            }
        };

        tracing::debug!(
            %method,
            path = %path,
            pattern = %matched.route.pattern(),
            exact = matched.exact,
            "Route matched"
        );

        if !matched.exact {
            ctx.request.set_route_params(matched.params);
        }

        match matched.route.handler() {
            Handler::View(view) => ctx.render(view, ViewParams::new()).map(Response::html),
            Handler::Action(action) => invoke_action(action, ctx),
        }
    }
}

fn invoke_action(action: &ActionRef, ctx: &mut RequestContext<'_>) -> Result<Response, AppError> {
    let mut controller = action.instantiate();
    ctx.set_active_controller(ActiveController::new(
        action.controller_name(),
        action.action(),
        controller.layout().map(str::to_string),
    ));

    for middleware in controller.middlewares() {
        middleware.execute(ctx)?;
    }

    controller.invoke(action.action(), ctx)
}
