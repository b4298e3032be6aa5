//! SQLite connection wrapper.

use std::path::PathBuf;
use std::sync::Mutex;

use rusqlite::Connection;

/// Persistence failure.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("invalid database DSN '{0}'")]
    InvalidDsn(String),

    #[error("invalid SQL identifier '{0}'")]
    InvalidIdentifier(String),

    #[error("database connection lock poisoned")]
    Poisoned,
}

/// Where the database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbLocation {
    Memory,
    File(PathBuf),
}

impl DbLocation {
    /// Parse `sqlite::memory:`, `sqlite://path` or `sqlite:path`.
    pub fn parse(dsn: &str) -> Result<Self, DbError> {
        let rest = dsn
            .strip_prefix("sqlite:")
            .ok_or_else(|| DbError::InvalidDsn(dsn.to_string()))?;
        let rest = rest.strip_prefix("//").unwrap_or(rest);

        match rest {
            "" => Err(DbError::InvalidDsn(dsn.to_string())),
            ":memory:" => Ok(DbLocation::Memory),
            path => Ok(DbLocation::File(PathBuf::from(path))),
        }
    }
}

/// A single SQLite connection shared behind a mutex.
pub struct Database {
    conn: Mutex<Connection>,
    location: DbLocation,
}

impl Database {
    /// Open the database named by `dsn` and apply connection pragmas.
    pub fn open(dsn: &str) -> Result<Self, DbError> {
        let location = DbLocation::parse(dsn)?;
        let conn = match &location {
            DbLocation::Memory => Connection::open_in_memory()?,
            DbLocation::File(path) => Connection::open(path)?,
        };
        Self::from_connection(conn, location)
    }

    pub fn open_in_memory() -> Result<Self, DbError> {
        Self::from_connection(Connection::open_in_memory()?, DbLocation::Memory)
    }

    fn from_connection(conn: Connection, location: DbLocation) -> Result<Self, DbError> {
        if let DbLocation::File(_) = location {
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        }
        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;
            PRAGMA busy_timeout = 5000;
            ",
        )?;

        tracing::debug!(location = ?location, "Database opened");
        Ok(Self {
            conn: Mutex::new(conn),
            location,
        })
    }

    pub fn location(&self) -> &DbLocation {
        &self.location
    }

    /// Run `f` with exclusive access to the connection.
    pub fn with_conn<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Connection) -> Result<T, E>,
        E: From<DbError>,
    {
        let conn = self.conn.lock().map_err(|_| DbError::Poisoned)?;
        f(&conn)
    }

    /// Like [`with_conn`](Self::with_conn), for APIs such as
    /// `Connection::transaction` that need `&mut`.
    pub fn with_conn_mut<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Connection) -> Result<T, E>,
        E: From<DbError>,
    {
        let mut conn = self.conn.lock().map_err(|_| DbError::Poisoned)?;
        f(&mut conn)
    }

    /// Execute one or more statements without parameters.
    pub fn execute_batch(&self, sql: &str) -> Result<(), DbError> {
        self.with_conn(|conn| conn.execute_batch(sql).map_err(DbError::from))
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("location", &self.location)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dsn() {
        assert_eq!(DbLocation::parse("sqlite::memory:").unwrap(), DbLocation::Memory);
        assert_eq!(
            DbLocation::parse("sqlite://data/app.db").unwrap(),
            DbLocation::File(PathBuf::from("data/app.db"))
        );
        assert_eq!(
            DbLocation::parse("sqlite:///var/app.db").unwrap(),
            DbLocation::File(PathBuf::from("/var/app.db"))
        );
        assert_eq!(
            DbLocation::parse("sqlite:app.db").unwrap(),
            DbLocation::File(PathBuf::from("app.db"))
        );
        assert!(DbLocation::parse("mysql://localhost/app").is_err());
        assert!(DbLocation::parse("sqlite://").is_err());
    }

    #[test]
    fn test_with_conn() {
        let db = Database::open("sqlite::memory:").unwrap();
        db.execute_batch("CREATE TABLE t (v INTEGER); INSERT INTO t VALUES (41);")
            .unwrap();
        let v: i64 = db
            .with_conn(|conn| {
                conn.query_row("SELECT v + 1 FROM t", [], |row| row.get(0))
                    .map_err(DbError::from)
            })
            .unwrap();
        assert_eq!(v, 42);
    }

    #[test]
    fn test_with_conn_mut_transaction() {
        let db = Database::open_in_memory().unwrap();
        db.execute_batch("CREATE TABLE t (v INTEGER)").unwrap();
        db.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute("INSERT INTO t VALUES (1)", [])?;
            drop(tx);
            Ok::<_, DbError>(())
        })
        .unwrap();

        let rows: i64 = db
            .with_conn(|conn| {
                conn.query_row("SELECT COUNT(*) FROM t", [], |row| row.get(0))
                    .map_err(DbError::from)
            })
            .unwrap();
        assert_eq!(rows, 0);
    }
}
