//! Migration ledger against an on-disk database.

use std::fs;

use tempfile::TempDir;

use webmvc::config::MigrationConfig;
use webmvc::db::{Database, DbError};
use webmvc::migrations::{MigrationError, MigrationManager};

mod common;

struct Fixture {
    dir: TempDir,
    config: MigrationConfig,
    dsn: String,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let migrations = dir.path().join("migrations");
        fs::create_dir(&migrations).unwrap();

        // Written out of order; application order is by name.
        common::write_migration(
            &migrations,
            "003_seed",
            "INSERT INTO users (email, name) VALUES ('ada@example.com', 'Ada');",
            "DELETE FROM users;",
        );
        common::write_migration(
            &migrations,
            "001_init",
            "CREATE TABLE users (id INTEGER PRIMARY KEY, email TEXT NOT NULL);",
            "DROP TABLE users;",
        );
        common::write_migration(
            &migrations,
            "002_add_col",
            "ALTER TABLE users ADD COLUMN name TEXT;",
            "ALTER TABLE users DROP COLUMN name;",
        );

        let config = MigrationConfig {
            path: migrations.display().to_string(),
            table: "migrations".into(),
        };
        let dsn = format!("sqlite://{}", dir.path().join("app.db").display());
        Self { dir, config, dsn }
    }

    fn open(&self) -> Database {
        Database::open(&self.dsn).unwrap()
    }
}

fn users(db: &Database) -> Result<i64, DbError> {
    db.with_conn(|conn| {
        conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .map_err(DbError::from)
    })
}

#[test]
fn test_apply_persists_across_connections() {
    let fixture = Fixture::new();

    {
        let db = fixture.open();
        let manager = MigrationManager::from_config(&db, &fixture.config).unwrap();
        assert_eq!(
            manager.apply_pending().unwrap(),
            vec!["001_init", "002_add_col", "003_seed"]
        );
    }

    let db = fixture.open();
    assert_eq!(users(&db).unwrap(), 1);

    let manager = MigrationManager::from_config(&db, &fixture.config).unwrap();
    assert!(manager.apply_pending().unwrap().is_empty());
    assert!(manager.status().unwrap().iter().all(|s| s.is_applied()));
}

#[test]
fn test_new_file_is_applied_alone() {
    let fixture = Fixture::new();
    let db = fixture.open();
    let manager = MigrationManager::from_config(&db, &fixture.config).unwrap();
    manager.apply_pending().unwrap();

    common::write_migration(
        fixture.dir.path().join("migrations").as_path(),
        "004_more",
        "INSERT INTO users (email) VALUES ('alan@example.com');",
        "DELETE FROM users WHERE email = 'alan@example.com';",
    );
    assert_eq!(manager.apply_pending().unwrap(), vec!["004_more"]);
    assert_eq!(users(&db).unwrap(), 2);

    assert_eq!(manager.undo_last().unwrap().as_deref(), Some("004_more"));
    assert_eq!(users(&db).unwrap(), 1);
}

#[test]
fn test_undo_all_and_reapply() {
    let fixture = Fixture::new();
    let db = fixture.open();
    let manager = MigrationManager::from_config(&db, &fixture.config).unwrap();
    manager.apply_pending().unwrap();

    assert_eq!(
        manager.undo_all().unwrap(),
        vec!["003_seed", "002_add_col", "001_init"]
    );
    assert!(users(&db).is_err());
    assert!(manager.status().unwrap().iter().all(|s| !s.is_applied()));

    assert_eq!(manager.apply_pending().unwrap().len(), 3);
    assert_eq!(users(&db).unwrap(), 1);
}

#[test]
fn test_broken_file_leaves_database_untouched() {
    let fixture = Fixture::new();
    let db = fixture.open();
    let manager = MigrationManager::from_config(&db, &fixture.config).unwrap();
    manager.apply_pending().unwrap();

    let migrations = fixture.dir.path().join("migrations");
    common::write_migration(
        &migrations,
        "004_ok",
        "CREATE TABLE tags (id INTEGER PRIMARY KEY);",
        "DROP TABLE tags;",
    );
    common::write_migration(&migrations, "005_broken", "CREATE TABLE oops (;", "");

    let err = manager.apply_pending().unwrap_err();
    assert!(matches!(err, MigrationError::Unit { ref name, .. } if name == "005_broken"));

    let tags: bool = db
        .with_conn(|conn| {
            conn.query_row(
                "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE name = 'tags')",
                [],
                |row| row.get(0),
            )
            .map_err(DbError::from)
        })
        .unwrap();
    assert!(!tags);

    let pending: Vec<String> = manager
        .status()
        .unwrap()
        .into_iter()
        .filter(|s| !s.is_applied())
        .map(|s| s.name)
        .collect();
    assert_eq!(pending, vec!["004_ok", "005_broken"]);
}

#[test]
fn test_missing_directory() {
    let db = Database::open_in_memory().unwrap();
    let config = MigrationConfig {
        path: "/no/such/dir".into(),
        table: "migrations".into(),
    };
    let manager = MigrationManager::from_config(&db, &config).unwrap();
    assert!(matches!(
        manager.apply_pending(),
        Err(MigrationError::Io { .. })
    ));
}
