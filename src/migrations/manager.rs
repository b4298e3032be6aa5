//! Apply and undo migrations against the ledger.

use std::collections::HashSet;

use rusqlite::Connection;
use tracing::{info, warn};

use crate::config::MigrationConfig;
use crate::db::Database;
use crate::migrations::ledger::{Ledger, MigrationRecord};
use crate::migrations::source::{DirectorySource, MigrationSource};
use crate::migrations::{Direction, MigrationError};
use crate::observability::metrics;

/// One row of [`MigrationManager::status`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    pub name: String,
    /// `None` while pending.
    pub applied: Option<MigrationRecord>,
    /// False when the ledger names a unit the source no longer has.
    pub available: bool,
}

impl MigrationStatus {
    pub fn is_applied(&self) -> bool {
        self.applied.is_some()
    }
}

/// Drives a [`MigrationSource`] against one database.
///
/// Every operation runs in a single `BEGIN IMMEDIATE` transaction.
pub struct MigrationManager<'a, S> {
    db: &'a Database,
    source: S,
    ledger: Ledger,
}

impl<'a, S: MigrationSource> MigrationManager<'a, S> {
    pub fn new(db: &'a Database, source: S, table: &str) -> Result<Self, MigrationError> {
        Ok(Self {
            db,
            source,
            ledger: Ledger::new(table)?,
        })
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Apply every unit not yet in the ledger, in name order.
    ///
    /// Returns the names applied by this call.
    pub fn apply_pending(&self) -> Result<Vec<String>, MigrationError> {
        let applied = self.in_transaction(|conn| {
            self.ledger.ensure_table(conn)?;
            let done: HashSet<String> = self.ledger.applied_names(conn)?.into_iter().collect();
            let pending: Vec<String> = self
                .source
                .names()?
                .into_iter()
                .filter(|name| !done.contains(name))
                .collect();

            let mut applied = Vec::with_capacity(pending.len());
            for name in pending {
                self.run(conn, &name, Direction::Apply)?;
                applied.push(name);
            }

            if applied.is_empty() {
                info!("There are no migrations to apply");
            } else {
                self.ledger.insert_batch(conn, &applied)?;
            }
            Ok(applied)
        })?;

        metrics::record_migrations(Direction::Apply, applied.len());
        Ok(applied)
    }

    /// Undo every applied unit the source still has, newest name first,
    /// then drop the ledger table.
    pub fn undo_all(&self) -> Result<Vec<String>, MigrationError> {
        let undone = self.in_transaction(|conn| {
            if !self.ledger.exists(conn)? {
                info!("There are no migrations to undo");
                return Ok(Vec::new());
            }

            let available: HashSet<String> = self.source.names()?.into_iter().collect();
            let mut targets: Vec<String> = self
                .ledger
                .applied_names(conn)?
                .into_iter()
                .filter(|name| available.contains(name))
                .collect();
            targets.sort_by(|a, b| b.cmp(a));

            if targets.is_empty() {
                info!("There are no migrations to undo");
                return Ok(targets);
            }

            let mut undone = Vec::with_capacity(targets.len());
            for name in targets {
                self.run(conn, &name, Direction::Undo)?;
                undone.push(name);
            }

            self.ledger.delete_names(conn, &undone)?;
            self.ledger.drop_table(conn)?;
            info!(table = %self.ledger.table(), "Dropped migrations table");
            Ok(undone)
        })?;

        metrics::record_migrations(Direction::Undo, undone.len());
        Ok(undone)
    }

    /// Undo only the most recently applied unit.
    pub fn undo_last(&self) -> Result<Option<String>, MigrationError> {
        let undone = self.in_transaction(|conn| {
            let last = if self.ledger.exists(conn)? {
                self.ledger.last_applied(conn)?
            } else {
                None
            };
            let Some(record) = last else {
                info!("There are no migrations to undo");
                return Ok(None);
            };

            self.run(conn, &record.name, Direction::Undo)?;
            self.ledger.delete_by_id(conn, record.id)?;
            Ok(Some(record.name))
        })?;

        metrics::record_migrations(Direction::Undo, usize::from(undone.is_some()));
        Ok(undone)
    }

    /// Every unit known to the source or the ledger, in name order.
    pub fn status(&self) -> Result<Vec<MigrationStatus>, MigrationError> {
        let names = self.source.names()?;
        let records = self.db.with_conn(|conn| {
            if self.ledger.exists(conn)? {
                self.ledger.records(conn).map_err(MigrationError::from)
            } else {
                Ok(Vec::new())
            }
        })?;

        let mut status: Vec<MigrationStatus> = names
            .iter()
            .map(|name| MigrationStatus {
                name: name.clone(),
                applied: records.iter().find(|r| &r.name == name).cloned(),
                available: true,
            })
            .collect();
        for record in records.iter().filter(|r| !names.contains(&r.name)) {
            status.push(MigrationStatus {
                name: record.name.clone(),
                applied: Some(record.clone()),
                available: false,
            });
        }
        status.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(status)
    }

    fn run(&self, conn: &Connection, name: &str, direction: Direction) -> Result<(), MigrationError> {
        let unit = self.source.load(name)?;
        let (verb, done) = match direction {
            Direction::Apply => ("Applying", "Applied"),
            Direction::Undo => ("Undoing", "Undone"),
        };

        info!(migration = %name, "{verb} migration");
        let result = match direction {
            Direction::Apply => unit.apply(conn),
            Direction::Undo => unit.undo(conn),
        };
        result.map_err(|source| MigrationError::Unit {
            name: name.to_string(),
            direction,
            source,
        })?;
        info!(migration = %name, "{done} migration");
        Ok(())
    }

    /// Run `f` inside `BEGIN IMMEDIATE`, committing on success and rolling
    /// back on any error.
    fn in_transaction<T, F>(&self, f: F) -> Result<T, MigrationError>
    where
        F: FnOnce(&Connection) -> Result<T, MigrationError>,
    {
        self.db.with_conn(|conn| {
            conn.execute_batch("BEGIN IMMEDIATE")?;
            match f(conn) {
                Ok(value) => {
                    conn.execute_batch("COMMIT")?;
                    Ok(value)
                }
                Err(err) => {
                    warn!(error = %err, "Migration failed, rolling back");
                    if let Err(rollback) = conn.execute_batch("ROLLBACK") {
                        warn!(error = %rollback, "Rollback failed");
                    }
                    Err(err)
                }
            }
        })
    }
}

impl<'a> MigrationManager<'a, DirectorySource> {
    /// Manager over the `[migrations]` directory and ledger table.
    pub fn from_config(db: &'a Database, config: &MigrationConfig) -> Result<Self, MigrationError> {
        Self::new(db, DirectorySource::new(&config.path), &config.table)
    }
}
