//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, limits, session cookie)
//!     → request.rs (path, query, form, headers, route params)
//!     → Application::handle on a blocking worker
//!         → middleware/ (per-controller gates such as auth)
//!     → response.rs (HTML page or redirect)
//!     → Send to client
//! ```

pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use request::Request;
pub use response::{Redirect, Response};
pub use server::HttpServer;
