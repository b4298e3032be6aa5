//! Session subsystem.
//!
//! # Data Flow
//! ```text
//! Request (session_id cookie)
//!     → store.rs load (lock the session; unknown or idle id → fresh session)
//!     → begin_request (existing flash marked for removal)
//!     → handlers read/write values and flash
//!     → end_request (marked flash dropped)
//!     → store.rs save (write back, unlock)
//! ```
//!
//! # Design Decisions
//! - Explicit request-boundary hooks instead of teardown-driven cleanup
//! - Handlers work on a private copy while holding the session's lock, so
//!   concurrent requests on one session never overwrite each other
//! - Empty new sessions are never stored, so anonymous traffic costs nothing

pub mod flash;
pub mod store;

pub use flash::FlashMessages;
pub use store::{Session, SessionData, SessionStore};
