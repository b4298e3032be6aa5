//! Authentication gate.
//! Denies guarded actions to sessions without a logged-in user.

use crate::app::RequestContext;
use crate::error::AppError;
use crate::http::middleware::Middleware;

/// Requires an authenticated session for some or all actions.
#[derive(Debug, Clone, Default)]
pub struct AuthMiddleware {
    /// Guarded actions. Empty means every action.
    actions: Vec<String>,
}

impl AuthMiddleware {
    pub fn new<I, S>(actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            actions: actions.into_iter().map(Into::into).collect(),
        }
    }

    /// Guard every action of the controller.
    pub fn all() -> Self {
        Self::default()
    }

    fn guards(&self, action: Option<&str>) -> bool {
        if self.actions.is_empty() {
            return true;
        }
        action.is_some_and(|a| self.actions.iter().any(|guarded| guarded == a))
    }
}

impl Middleware for AuthMiddleware {
    fn execute(&self, ctx: &RequestContext<'_>) -> Result<(), AppError> {
        let action = ctx.active_controller().map(|c| c.action());
        if !ctx.is_authenticated() && self.guards(action) {
            tracing::info!(
                path = %ctx.request.path(),
                action = action.unwrap_or("-"),
                "Unauthenticated access denied"
            );
            return Err(AppError::forbidden());
        }
        Ok(())
    }
}
