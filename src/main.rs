//! webmvc server.
//!
//! Boots an [`Application`] from a TOML config and serves it over HTTP.
//!
//! ```text
//!     Client Request
//!     ─────────────▶ axum (request id, trace, timeout, body limit)
//!                        │
//!                        ▼
//!                    dispatch_handler ──spawn_blocking──▶ Application::handle
//!                                                             │
//!                          session ◀── events ◀── Router::resolve ──▶ controller
//!                                                             │        + middleware
//!                                                             ▼
//!     Client Response ◀──────────────────────────────── view / redirect
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use webmvc::config::{load_config, AppConfig};
use webmvc::lifecycle::{signals, Shutdown};
use webmvc::migrations::MigrationManager;
use webmvc::observability::{logging, metrics};
use webmvc::{Application, HttpServer};

#[derive(Parser)]
#[command(name = "webmvc")]
#[command(about = "Serve a webmvc application", long_about = None)]
struct Args {
    /// TOML config file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Apply pending migrations before serving.
    #[arg(long)]
    migrate: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };

    logging::init(&config.observability);
    tracing::info!("webmvc v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.server.bind_address,
        request_timeout_secs = config.server.request_timeout_secs,
        views = %config.views.views_path,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let app = Application::builder(config).config_routes().build()?;

    if args.migrate {
        match app.db() {
            Some(db) => {
                let applied = MigrationManager::from_config(db, &app.config().migrations)?
                    .apply_pending()?;
                tracing::info!(count = applied.len(), "Migrations applied");
            }
            None => tracing::warn!("--migrate given but no database is configured"),
        }
    }

    let app = Arc::new(app);
    let listener = TcpListener::bind(&app.config().server.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    signals::spawn_ctrl_c_handler(shutdown.clone());

    HttpServer::new(app).run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
