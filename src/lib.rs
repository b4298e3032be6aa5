//! A small MVC web framework: a route table with a pattern compiler,
//! controller dispatch with middleware, views, sessions, form and table
//! helpers, and a SQLite migration ledger.

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod http;
pub mod lifecycle;
pub mod migrations;
pub mod mvc;
pub mod observability;
pub mod routing;
pub mod session;
pub mod ui;
pub mod validation;

pub use app::{Application, ApplicationBuilder, RequestContext};
pub use config::AppConfig;
pub use error::AppError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
