//! Persistence subsystem.
//!
//! # Data Flow
//! ```text
//! config [database].dsn
//!     → database.rs (open SQLite, pragmas, one connection behind a mutex)
//!     → record.rs (find / insert / delete with equality WHERE clauses)
//!     → migrations (ledger table + unit SQL)
//! ```
//!
//! # Design Decisions
//! - Blocking rusqlite calls; request dispatch already runs on a blocking worker
//! - Every value is bound as a parameter; identifiers are validated
//! - Errors are never recovered here; they surface as PersistenceFailure

pub mod database;
pub mod record;

pub use database::{Database, DbError};
pub use record::{Aggregate, Record};
