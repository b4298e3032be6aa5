//! Active-record helpers over simple equality conditions.
//!
//! # Responsibilities
//! - Map a type to a table through the `Record` trait
//! - find / find_one / count / aggregate with `a = ? AND b = ?` conditions
//! - insert / insert_all / delete / delete_where
//!
//! # Design Decisions
//! - No joins, ordering or OR conditions
//! - Table and column names must be plain identifiers; values are always bound

use std::fmt;

use rusqlite::types::Value;
use rusqlite::{params_from_iter, Row};

use crate::db::database::{Database, DbError};

/// A type persisted as one row of one table.
pub trait Record: Sized {
    fn table_name() -> &'static str;

    fn primary_key() -> &'static str {
        "id"
    }

    /// Columns written on insert, in the order `values` returns them.
    fn attributes() -> &'static [&'static str];

    fn values(&self) -> Vec<Value>;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

/// Aggregate functions usable with [`aggregate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Aggregate::Count => "COUNT",
            Aggregate::Sum => "SUM",
            Aggregate::Avg => "AVG",
            Aggregate::Min => "MIN",
            Aggregate::Max => "MAX",
        })
    }
}

/// True for `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub(crate) fn identifier(name: &str) -> Result<&str, DbError> {
    if is_identifier(name) {
        Ok(name)
    } else {
        Err(DbError::InvalidIdentifier(name.to_string()))
    }
}

/// Build ` WHERE a = ?1 AND b = ?2` and its bound values.
fn where_clause(conditions: &[(&str, Value)]) -> Result<(String, Vec<Value>), DbError> {
    if conditions.is_empty() {
        return Ok((String::new(), Vec::new()));
    }

    let mut parts = Vec::with_capacity(conditions.len());
    let mut values = Vec::with_capacity(conditions.len());
    for (i, (column, value)) in conditions.iter().enumerate() {
        parts.push(format!("{} = ?{}", identifier(column)?, i + 1));
        values.push(value.clone());
    }
    Ok((format!(" WHERE {}", parts.join(" AND ")), values))
}

/// All rows matching `conditions`.
pub fn find<R: Record>(db: &Database, conditions: &[(&str, Value)]) -> Result<Vec<R>, DbError> {
    let table = identifier(R::table_name())?;
    let (clause, values) = where_clause(conditions)?;
    let sql = format!("SELECT * FROM {table}{clause}");

    db.with_conn(|conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), R::from_row)?;
        rows.collect::<rusqlite::Result<Vec<R>>>().map_err(DbError::from)
    })
}

/// First row matching `conditions`.
pub fn find_one<R: Record>(
    db: &Database,
    conditions: &[(&str, Value)],
) -> Result<Option<R>, DbError> {
    let table = identifier(R::table_name())?;
    let (clause, values) = where_clause(conditions)?;
    let sql = format!("SELECT * FROM {table}{clause} LIMIT 1");

    db.with_conn(|conn| {
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query_map(params_from_iter(values.iter()), R::from_row)?;
        rows.next().transpose().map_err(DbError::from)
    })
}

/// `function(attribute)` over rows matching `conditions`. `attribute` may be `*`.
pub fn aggregate<R: Record>(
    db: &Database,
    function: Aggregate,
    attribute: &str,
    conditions: &[(&str, Value)],
) -> Result<Value, DbError> {
    let table = identifier(R::table_name())?;
    let attribute = if attribute == "*" { "*" } else { identifier(attribute)? };
    let (clause, values) = where_clause(conditions)?;
    let sql = format!("SELECT {function}({attribute}) FROM {table}{clause}");

    db.with_conn(|conn| {
        conn.query_row(&sql, params_from_iter(values.iter()), |row| row.get(0))
            .map_err(DbError::from)
    })
}

/// Number of rows matching `conditions`.
pub fn count<R: Record>(db: &Database, conditions: &[(&str, Value)]) -> Result<i64, DbError> {
    match aggregate::<R>(db, Aggregate::Count, "*", conditions)? {
        Value::Integer(n) => Ok(n),
        _ => Ok(0),
    }
}

/// Insert one record. Returns the new rowid.
pub fn insert<R: Record>(db: &Database, record: &R) -> Result<i64, DbError> {
    let table = identifier(R::table_name())?;
    let columns = columns::<R>()?;
    let placeholders = (1..=R::attributes().len())
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!("INSERT INTO {table} ({columns}) VALUES ({placeholders})");

    db.with_conn(|conn| {
        conn.execute(&sql, params_from_iter(record.values()))?;
        Ok::<_, DbError>(conn.last_insert_rowid())
    })
}

/// Insert many records in one statement. Returns the number of rows written.
pub fn insert_all<R: Record>(db: &Database, records: &[R]) -> Result<usize, DbError> {
    if records.is_empty() {
        return Ok(0);
    }

    let table = identifier(R::table_name())?;
    let columns = columns::<R>()?;
    let width = R::attributes().len();
    let rows = (0..records.len())
        .map(|r| {
            let row = (1..=width)
                .map(|c| format!("?{}", r * width + c))
                .collect::<Vec<_>>()
                .join(", ");
            format!("({row})")
        })
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!("INSERT INTO {table} ({columns}) VALUES {rows}");
    let values: Vec<Value> = records.iter().flat_map(|r| r.values()).collect();

    db.with_conn(|conn| {
        conn.execute(&sql, params_from_iter(values.iter()))
            .map_err(DbError::from)
    })
}

/// Delete the row whose primary key equals `id`.
pub fn delete<R: Record>(db: &Database, id: impl Into<Value>) -> Result<bool, DbError> {
    let deleted = delete_where::<R>(db, &[(R::primary_key(), id.into())])?;
    Ok(deleted > 0)
}

/// Delete every row matching `conditions`. Returns the number deleted.
pub fn delete_where<R: Record>(
    db: &Database,
    conditions: &[(&str, Value)],
) -> Result<usize, DbError> {
    let table = identifier(R::table_name())?;
    let (clause, values) = where_clause(conditions)?;
    let sql = format!("DELETE FROM {table}{clause}");

    db.with_conn(|conn| {
        conn.execute(&sql, params_from_iter(values.iter()))
            .map_err(DbError::from)
    })
}

fn columns<R: Record>() -> Result<String, DbError> {
    let columns = R::attributes()
        .iter()
        .map(|c| identifier(c))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(columns.join(", "))
}
