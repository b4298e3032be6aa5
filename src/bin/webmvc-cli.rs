use std::path::PathBuf;

use clap::{Parser, Subcommand};

use webmvc::config::{load_config, AppConfig};
use webmvc::db::Database;
use webmvc::migrations::{MigrationManager, MigrationStatus};
use webmvc::observability::logging;

#[derive(Parser)]
#[command(name = "webmvc-cli")]
#[command(about = "Database migrations for a webmvc application", long_about = None)]
struct Cli {
    /// TOML config file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Database DSN, overriding `[database].dsn`.
    #[arg(long)]
    dsn: Option<String>,

    /// Migration directory, overriding `[migrations].path`.
    #[arg(long)]
    path: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply every pending migration
    Apply,
    /// Undo every applied migration and drop the ledger table
    Undo,
    /// Undo the most recently applied migration
    UndoLast,
    /// List migrations and whether they are applied
    Status,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    if let Some(path) = cli.path {
        config.migrations.path = path;
    }
    logging::init(&config.observability);

    let dsn = cli
        .dsn
        .or(config.database.dsn.clone())
        .ok_or("no database configured; pass --dsn or set [database].dsn")?;
    let db = Database::open(&dsn)?;
    let manager = MigrationManager::from_config(&db, &config.migrations)?;

    match cli.command {
        Commands::Apply => {
            let applied = manager.apply_pending()?;
            println!("Applied {} migration(s)", applied.len());
            for name in applied {
                println!("  {name}");
            }
        }
        Commands::Undo => {
            let undone = manager.undo_all()?;
            println!("Undid {} migration(s)", undone.len());
            for name in undone {
                println!("  {name}");
            }
        }
        Commands::UndoLast => match manager.undo_last()? {
            Some(name) => println!("Undid {name}"),
            None => println!("There are no migrations to undo"),
        },
        Commands::Status => print_status(&manager.status()?),
    }

    Ok(())
}

fn print_status(status: &[MigrationStatus]) {
    if status.is_empty() {
        println!("No migrations found");
        return;
    }
    println!("{:<40} {:<20} {}", "MIGRATION", "APPLIED AT", "NOTE");
    for entry in status {
        let applied = entry
            .applied
            .as_ref()
            .map(|r| r.applied_at.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "pending".to_string());
        let note = if entry.available { "" } else { "missing unit" };
        println!("{:<40} {:<20} {}", entry.name, applied, note);
    }
}
