//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Registration (at boot):
//!     router.get / router.post
//!     → table.rs (method → pattern → handler, registration order kept)
//!
//! Incoming Request (method, path):
//!     → router.rs (exact lookup, O(1))
//!     → pattern.rs (compiled on first use, cached; scanned in order)
//!     → route params written into the request
//!     → handler.rs (render view | controller + middleware + action)
//!     → Return: Response or NotFound
//! ```
//!
//! # Design Decisions
//! - Routes immutable once the application is built
//! - Exact match before any regex work
//! - Deterministic: registration order is the only tie-break
//! - First match wins

pub mod handler;
pub mod pattern;
pub mod router;
pub mod table;

pub use handler::{ActionRef, Handler};
pub use pattern::{CompiledPattern, PatternError, RouteParams};
pub use router::{RouteMatch, Router};
pub use table::{Method, Route, RouteTable};
