//! The table recording which units have been applied.
//!
//! # Responsibilities
//! - Create and drop the ledger table
//! - Read applied names in application order
//! - Batch-insert newly applied names, delete undone ones
//!
//! # Design Decisions
//! - All methods take the caller's connection so they join its transaction
//! - `created_at` is set by SQLite (`CURRENT_TIMESTAMP`, UTC)

use chrono::NaiveDateTime;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use crate::db::record::identifier;
use crate::db::DbError;

/// One row of the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationRecord {
    pub id: i64,
    pub name: String,
    pub applied_at: NaiveDateTime,
}

impl MigrationRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            applied_at: row.get(2)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Ledger {
    table: String,
}

impl Ledger {
    pub fn new(table: &str) -> Result<Self, DbError> {
        Ok(Self {
            table: identifier(table)?.to_string(),
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn ensure_table(&self, conn: &Connection) -> rusqlite::Result<()> {
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )",
            self.table
        ))
    }

    pub fn exists(&self, conn: &Connection) -> rusqlite::Result<bool> {
        conn.query_row(
            "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
            params![self.table],
            |row| row.get(0),
        )
    }

    /// Applied names in the order they were recorded.
    pub fn applied_names(&self, conn: &Connection) -> rusqlite::Result<Vec<String>> {
        let mut stmt = conn.prepare(&format!("SELECT name FROM {} ORDER BY id", self.table))?;
        let names = stmt.query_map([], |row| row.get(0))?;
        names.collect()
    }

    pub fn records(&self, conn: &Connection) -> rusqlite::Result<Vec<MigrationRecord>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT id, name, created_at FROM {} ORDER BY id",
            self.table
        ))?;
        let records = stmt.query_map([], MigrationRecord::from_row)?;
        records.collect()
    }

    /// Insert `names` in one statement. Writes nothing for an empty slice.
    pub fn insert_batch(&self, conn: &Connection, names: &[String]) -> rusqlite::Result<usize> {
        if names.is_empty() {
            return Ok(0);
        }
        let placeholders = (1..=names.len())
            .map(|i| format!("(?{i})"))
            .collect::<Vec<_>>()
            .join(", ");
        conn.execute(
            &format!("INSERT INTO {} (name) VALUES {placeholders}", self.table),
            params_from_iter(names.iter()),
        )
    }

    /// The most recently applied record. Ties on `created_at` go to the higher id.
    pub fn last_applied(&self, conn: &Connection) -> rusqlite::Result<Option<MigrationRecord>> {
        conn.query_row(
            &format!(
                "SELECT id, name, created_at FROM {} ORDER BY created_at DESC, id DESC LIMIT 1",
                self.table
            ),
            [],
            MigrationRecord::from_row,
        )
        .optional()
    }

    pub fn delete_names(&self, conn: &Connection, names: &[String]) -> rusqlite::Result<usize> {
        if names.is_empty() {
            return Ok(0);
        }
        let placeholders = (1..=names.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        conn.execute(
            &format!("DELETE FROM {} WHERE name IN ({placeholders})", self.table),
            params_from_iter(names.iter()),
        )
    }

    pub fn delete_by_id(&self, conn: &Connection, id: i64) -> rusqlite::Result<bool> {
        let deleted = conn.execute(
            &format!("DELETE FROM {} WHERE id = ?1", self.table),
            params![id],
        )?;
        Ok(deleted > 0)
    }

    pub fn drop_table(&self, conn: &Connection) -> rusqlite::Result<()> {
        conn.execute_batch(&format!("DROP TABLE IF EXISTS {}", self.table))
    }
}
