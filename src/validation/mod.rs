//! Model validation.
//!
//! # Responsibilities
//! - Declare per-attribute rules through the `Validate` trait
//! - Run every rule and collect messages per attribute
//!
//! # Design Decisions
//! - Each rule runs its own check only
//! - Lengths count characters, not bytes
//! - `Unique` queries the database; its errors propagate, they are not
//!   reported as validation messages

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::types::Value;
use serde::Serialize;

use crate::db::record::identifier;
use crate::db::{Database, DbError};
use crate::error::AppError;

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)+$")
        .expect("email regex is valid")
});

/// A constraint on one attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    Required,
    Email,
    /// Minimum length in characters.
    Min(usize),
    /// Maximum length in characters.
    Max(usize),
    /// Must equal the named attribute.
    Match(&'static str),
    /// No row of `table` may already hold this value in `column`.
    Unique {
        table: &'static str,
        column: &'static str,
    },
}

impl Rule {
    fn message(&self, field: &str, labels: &dyn Fn(&str) -> String) -> String {
        match self {
            Rule::Required => "This field is required".to_string(),
            Rule::Email => "This field must be a valid email address".to_string(),
            Rule::Min(min) => format!("Minimum length of this field must be {min}"),
            Rule::Max(max) => format!("Maximum length of this field must be {max}"),
            Rule::Match(other) => format!("This field must be the same as {}", labels(other)),
            Rule::Unique { .. } => format!("A record with this {field} already exists"),
        }
    }
}

/// A model with validation rules.
pub trait Validate {
    /// Attributes and their rules, in the order they are checked.
    fn rules(&self) -> Vec<(&'static str, Vec<Rule>)>;

    /// Current value of `attribute`. `None` is treated as empty.
    fn value(&self, attribute: &str) -> Option<String>;

    /// Human-readable attribute name used in messages.
    fn label(&self, attribute: &str) -> String {
        attribute.to_string()
    }
}

/// Messages per attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    errors: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, attribute: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(attribute.into())
            .or_default()
            .push(message.into());
    }

    pub fn has_error(&self, attribute: &str) -> bool {
        self.errors.contains_key(attribute)
    }

    pub fn first_error(&self, attribute: &str) -> Option<&str> {
        self.errors
            .get(attribute)
            .and_then(|messages| messages.first())
            .map(String::as_str)
    }

    pub fn errors(&self, attribute: &str) -> &[String] {
        self.errors.get(attribute).map_or(&[], Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.errors.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

/// Check every rule of `model`.
///
/// `db` is only consulted by [`Rule::Unique`]; a model using that rule
/// without a database is an error.
pub fn validate<M: Validate + ?Sized>(
    model: &M,
    db: Option<&Database>,
) -> Result<ValidationErrors, AppError> {
    let mut errors = ValidationErrors::new();
    let labels = |attribute: &str| model.label(attribute);

    for (attribute, rules) in model.rules() {
        let value = model.value(attribute).unwrap_or_default();
        for rule in &rules {
            let failed = match rule {
                Rule::Required => value.is_empty(),
                Rule::Email => !EMAIL.is_match(&value),
                Rule::Min(min) => value.chars().count() < *min,
                Rule::Max(max) => value.chars().count() > *max,
                Rule::Match(other) => model.value(other).unwrap_or_default() != value,
                Rule::Unique { table, column } => {
                    let db = db.ok_or_else(|| {
                        AppError::Internal(format!(
                            "unique rule on '{attribute}' needs a database"
                        ))
                    })?;
                    exists(db, table, column, &value)?
                }
            };
            if failed {
                errors.add(attribute, rule.message(&model.label(attribute), &labels));
            }
        }
    }

    if !errors.is_empty() {
        tracing::debug!(attributes = errors.errors.len(), "Validation failed");
    }
    Ok(errors)
}

fn exists(db: &Database, table: &str, column: &str, value: &str) -> Result<bool, DbError> {
    let sql = format!(
        "SELECT EXISTS (SELECT 1 FROM {} WHERE {} = ?1)",
        identifier(table)?,
        identifier(column)?
    );
    db.with_conn(|conn| {
        conn.query_row(&sql, [Value::Text(value.to_string())], |row| row.get(0))
            .map_err(DbError::from)
    })
}
