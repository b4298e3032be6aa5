//! Controller middleware.
//!
//! # Design Decisions
//! - Synchronous: runs inside the request's blocking dispatch
//! - A middleware denies by returning an error; the router does not catch it
//! - Runs after the controller is recorded as active, so it can see the action

pub mod auth;

pub use auth::AuthMiddleware;

use crate::app::RequestContext;
use crate::error::AppError;

/// A check run before a controller action.
pub trait Middleware: Send + Sync {
    fn execute(&self, ctx: &RequestContext<'_>) -> Result<(), AppError>;
}
