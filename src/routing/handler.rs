//! Route handlers.

use std::fmt;
use std::sync::Arc;

use crate::mvc::controller::Controller;

type ControllerFactory = Arc<dyn Fn() -> Box<dyn Controller> + Send + Sync>;

/// What a route dispatches to.
#[derive(Clone)]
pub enum Handler {
    /// Render a view by name. No controller, no middleware.
    View(String),
    /// Instantiate a controller and invoke one of its actions.
    Action(ActionRef),
}

impl Handler {
    pub fn view(name: impl Into<String>) -> Self {
        Handler::View(name.into())
    }

    /// Action handler for controller type `C`.
    pub fn action<C>(action: impl Into<String>) -> Self
    where
        C: Controller + Default + 'static,
    {
        Handler::Action(ActionRef {
            controller: std::any::type_name::<C>(),
            action: action.into(),
            factory: Arc::new(|| Box::new(C::default())),
        })
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handler::View(name) => f.debug_tuple("View").field(name).finish(),
            Handler::Action(action) => f
                .debug_struct("Action")
                .field("controller", &action.controller)
                .field("action", &action.action)
                .finish(),
        }
    }
}

/// A controller type plus the action to invoke on it.
#[derive(Clone)]
pub struct ActionRef {
    controller: &'static str,
    action: String,
    factory: ControllerFactory,
}

impl ActionRef {
    /// Fully qualified controller type name.
    pub fn controller_name(&self) -> &'static str {
        self.controller
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    /// Build a fresh controller for this dispatch.
    pub fn instantiate(&self) -> Box<dyn Controller> {
        (self.factory)()
    }
}
