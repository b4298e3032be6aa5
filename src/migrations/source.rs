//! Where migration units come from.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::migrations::unit::{MigrationUnit, SqlMigration};
use crate::migrations::MigrationError;

/// An enumerable set of migration units.
pub trait MigrationSource: Send + Sync {
    /// Unit names in lexicographic order.
    fn names(&self) -> Result<Vec<String>, MigrationError>;

    fn load(&self, name: &str) -> Result<Arc<dyn MigrationUnit>, MigrationError>;
}

/// `.sql` files in one directory. The file stem is the unit name.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: PathBuf,
}

impl DirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn io_error(&self, source: std::io::Error) -> MigrationError {
        MigrationError::Io {
            path: self.dir.clone(),
            source,
        }
    }
}

impl MigrationSource for DirectorySource {
    fn names(&self) -> Result<Vec<String>, MigrationError> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir).map_err(|e| self.io_error(e))? {
            let path = entry.map_err(|e| self.io_error(e))?.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("sql") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn load(&self, name: &str) -> Result<Arc<dyn MigrationUnit>, MigrationError> {
        let path = self.dir.join(format!("{name}.sql"));
        if !path.is_file() {
            return Err(MigrationError::UnknownUnit(name.to_string()));
        }
        Ok(Arc::new(SqlMigration::from_file(&path)?))
    }
}

/// Units registered in code.
#[derive(Default, Clone)]
pub struct StaticSource {
    units: BTreeMap<String, Arc<dyn MigrationUnit>>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, unit: impl MigrationUnit + 'static) -> Self {
        self.units.insert(unit.name().to_string(), Arc::new(unit));
        self
    }
}

impl MigrationSource for StaticSource {
    fn names(&self) -> Result<Vec<String>, MigrationError> {
        Ok(self.units.keys().cloned().collect())
    }

    fn load(&self, name: &str) -> Result<Arc<dyn MigrationUnit>, MigrationError> {
        self.units
            .get(name)
            .cloned()
            .ok_or_else(|| MigrationError::UnknownUnit(name.to_string()))
    }
}
