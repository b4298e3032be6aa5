//! Schema migrations.
//!
//! # Data Flow
//! ```text
//! source.rs (directory of NNN_name.sql, or code-defined units)
//!     → names sorted lexicographically
//!     → manager.rs diffs against ledger.rs (applied names)
//!     → unit.rs apply()/undo() on the shared connection
//!     → ledger.rs batch insert / delete / drop
//! ```
//!
//! # Design Decisions
//! - Unit order is the sorted name order, never the filesystem listing order
//! - Every operation holds one BEGIN IMMEDIATE transaction: single writer,
//!   and a failing unit leaves neither schema nor ledger half-written
//! - No compensating undo() is ever run for a failed batch
//! - The ledger records a unit only after its apply() returned Ok

pub mod ledger;
pub mod manager;
pub mod source;
pub mod unit;

pub use ledger::{Ledger, MigrationRecord};
pub use manager::{MigrationManager, MigrationStatus};
pub use source::{DirectorySource, MigrationSource, StaticSource};
pub use unit::{FnMigration, MigrationUnit, SqlMigration, UnitError};

use std::fmt;
use std::path::PathBuf;

use crate::db::DbError;

/// Which half of a unit failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Apply,
    Undo,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Apply => f.write_str("apply"),
            Direction::Undo => f.write_str("undo"),
        }
    }
}

/// Migration failure.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error("migration '{name}' failed to {direction}: {source}")]
    Unit {
        name: String,
        direction: Direction,
        #[source]
        source: UnitError,
    },

    #[error("migration '{0}' is recorded in the ledger but has no unit")]
    UnknownUnit(String),

    #[error("failed to read migrations from '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<rusqlite::Error> for MigrationError {
    fn from(err: rusqlite::Error) -> Self {
        MigrationError::Db(DbError::Sqlite(err))
    }
}
