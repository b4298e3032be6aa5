//! Controller contract.

use crate::app::RequestContext;
use crate::error::AppError;
use crate::http::middleware::Middleware;
use crate::http::response::Response;

/// A controller groups actions that share a layout and middleware.
///
/// A fresh instance is built for every dispatch, so implementations may
/// keep per-request state in `self`.
///
/// ```ignore
/// #[derive(Default)]
/// struct UserController;
///
/// impl Controller for UserController {
///     fn middlewares(&self) -> Vec<Box<dyn Middleware>> {
///         vec![Box::new(AuthMiddleware::new(["edit"]))]
///     }
///
///     fn invoke(&mut self, action: &str, ctx: &mut RequestContext<'_>) -> Result<Response, AppError> {
///         match action {
///             "show" => ctx.render("user", ViewParams::new()).map(Response::html),
///             _ => Err(AppError::not_found()),
///         }
///     }
/// }
/// ```
pub trait Controller: Send {
    /// Layout used when this controller renders a view.
    /// `None` (or an empty name) falls back to the application default.
    fn layout(&self) -> Option<&str> {
        None
    }

    /// Middleware run, in order, before every action.
    fn middlewares(&self) -> Vec<Box<dyn Middleware>> {
        Vec::new()
    }

    /// Run `action` for the current request.
    fn invoke(&mut self, action: &str, ctx: &mut RequestContext<'_>) -> Result<Response, AppError>;
}
