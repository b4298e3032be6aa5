//! Controllers and views.
//!
//! # Data Flow
//! ```text
//! Router resolves Handler::Action
//!     → controller.rs (fresh instance, middleware list, layout)
//!     → action writes a Response, usually via ctx.render
//!     → view.rs (view file + params → layout {{content}})
//! ```
//!
//! # Design Decisions
//! - Views are plain files with `{{key}}` substitution, not a template language
//! - Missing view or layout is NotFound, same as a missing route

pub mod controller;
pub mod view;

pub use controller::Controller;
pub use view::{ViewParams, ViewRenderer};
