//! Migration units.

use std::fs;
use std::path::Path;

use rusqlite::Connection;

use crate::migrations::MigrationError;

/// Error raised by a unit's apply or undo step.
pub type UnitError = Box<dyn std::error::Error + Send + Sync>;

/// A named schema change with an inverse.
///
/// Units run inside the manager's transaction and must not issue
/// `BEGIN`/`COMMIT` themselves.
pub trait MigrationUnit: Send + Sync {
    fn name(&self) -> &str;

    fn apply(&self, conn: &Connection) -> Result<(), UnitError>;

    fn undo(&self, conn: &Connection) -> Result<(), UnitError>;
}

/// A unit read from a `.sql` file with `-- up` / `-- down` sections.
///
/// ```sql
/// -- up
/// CREATE TABLE users (id INTEGER PRIMARY KEY, email TEXT NOT NULL);
/// -- down
/// DROP TABLE users;
/// ```
///
/// A file without markers is all `up` with an empty `down`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlMigration {
    name: String,
    up: String,
    down: String,
}

#[derive(Clone, Copy)]
enum Section {
    Preamble,
    Up,
    Down,
}

impl SqlMigration {
    pub fn new(name: impl Into<String>, up: impl Into<String>, down: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            up: up.into(),
            down: down.into(),
        }
    }

    /// Load the file at `path`; its stem is the unit name.
    pub fn from_file(path: &Path) -> Result<Self, MigrationError> {
        let source = fs::read_to_string(path).map_err(|source| MigrationError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::parse(name, &source))
    }

    /// Split `source` into its up and down sections.
    pub fn parse(name: impl Into<String>, source: &str) -> Self {
        let mut section = Section::Preamble;
        let mut preamble = String::new();
        let mut up = String::new();
        let mut down = String::new();
        let mut has_markers = false;

        for line in source.lines() {
            if let Some(next) = marker(line) {
                section = next;
                has_markers = true;
                continue;
            }
            let target = match section {
                Section::Preamble => &mut preamble,
                Section::Up => &mut up,
                Section::Down => &mut down,
            };
            target.push_str(line);
            target.push('\n');
        }

        if !has_markers {
            up = preamble;
        }

        Self::new(name, up.trim().to_string(), down.trim().to_string())
    }

    pub fn up_sql(&self) -> &str {
        &self.up
    }

    pub fn down_sql(&self) -> &str {
        &self.down
    }
}

fn marker(line: &str) -> Option<Section> {
    let rest = line.trim().strip_prefix("--")?.trim();
    if rest.eq_ignore_ascii_case("up") {
        Some(Section::Up)
    } else if rest.eq_ignore_ascii_case("down") {
        Some(Section::Down)
    } else {
        None
    }
}

impl MigrationUnit for SqlMigration {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, conn: &Connection) -> Result<(), UnitError> {
        conn.execute_batch(&self.up)?;
        Ok(())
    }

    fn undo(&self, conn: &Connection) -> Result<(), UnitError> {
        if self.down.is_empty() {
            tracing::warn!(migration = %self.name, "Migration has no down section");
            return Ok(());
        }
        conn.execute_batch(&self.down)?;
        Ok(())
    }
}

type StepFn = fn(&Connection) -> Result<(), UnitError>;

/// A code-defined unit built from two functions.
#[derive(Debug, Clone)]
pub struct FnMigration {
    name: String,
    apply: StepFn,
    undo: StepFn,
}

impl FnMigration {
    pub fn new(name: impl Into<String>, apply: StepFn, undo: StepFn) -> Self {
        Self {
            name: name.into(),
            apply,
            undo,
        }
    }
}

impl MigrationUnit for FnMigration {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, conn: &Connection) -> Result<(), UnitError> {
        (self.apply)(conn)
    }

    fn undo(&self, conn: &Connection) -> Result<(), UnitError> {
        (self.undo)(conn)
    }
}
