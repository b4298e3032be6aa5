//! Request lifecycle events.
//!
//! # Design Decisions
//! - Listeners are plain closures registered at boot
//! - Fired in registration order; the first error aborts the request
//! - Listener errors reach the same catch boundary as handler errors

use std::collections::HashMap;
use std::fmt;

use crate::app::RequestContext;
use crate::error::AppError;

/// Lifecycle points listeners can attach to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    BeforeRequest,
    AfterRequest,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::BeforeRequest => f.write_str("beforeRequest"),
            Event::AfterRequest => f.write_str("afterRequest"),
        }
    }
}

pub type Listener = Box<dyn Fn(&RequestContext<'_>) -> Result<(), AppError> + Send + Sync>;

/// Registry of event listeners.
#[derive(Default)]
pub struct EventDispatcher {
    listeners: HashMap<Event, Vec<Listener>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` for `event`.
    pub fn on<F>(&mut self, event: Event, listener: F)
    where
        F: Fn(&RequestContext<'_>) -> Result<(), AppError> + Send + Sync + 'static,
    {
        self.listeners.entry(event).or_default().push(Box::new(listener));
    }

    /// Run every listener for `event` in registration order.
    pub fn trigger(&self, event: Event, ctx: &RequestContext<'_>) -> Result<(), AppError> {
        let Some(listeners) = self.listeners.get(&event) else {
            return Ok(());
        };
        tracing::trace!(%event, count = listeners.len(), "Triggering event");
        for listener in listeners {
            listener(ctx)?;
        }
        Ok(())
    }

    pub fn listener_count(&self, event: Event) -> usize {
        self.listeners.get(&event).map_or(0, Vec::len)
    }
}
