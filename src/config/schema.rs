//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files,
//! and every section has defaults so an empty file is a valid config.

use serde::{Deserialize, Serialize};

/// Root configuration for an application.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP listener and request limits.
    pub server: ServerConfig,

    /// View and layout locations.
    pub views: ViewConfig,

    /// Database connection.
    pub database: DatabaseConfig,

    /// Migration directory and ledger table.
    pub migrations: MigrationConfig,

    /// Session cookie and authentication key.
    pub session: SessionConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// View routes declared in config rather than code.
    pub routes: Vec<RouteConfig>,
}

/// A route that renders a view.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// `get` or `post`.
    #[serde(default = "default_route_method")]
    pub method: String,

    /// Path or pattern, e.g. `/posts/{slug}`.
    pub path: String,

    /// View name rendered for this route.
    pub view: String,
}

fn default_route_method() -> String {
    "get".to_string()
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Total time allowed per request, in seconds.
    pub request_timeout_secs: u64,

    /// Largest accepted request body.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
            max_body_bytes: 2 * 1024 * 1024,
        }
    }
}

/// Where views and layouts are read from.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ViewConfig {
    pub views_path: String,
    pub layouts_path: String,

    /// Layout used when a controller does not name one.
    pub default_layout: String,

    /// View rendered, without layout, when a request fails.
    pub error_view: String,

    /// File extension of views and layouts, without the dot.
    pub extension: String,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            views_path: "views".to_string(),
            layouts_path: "views/layouts".to_string(),
            default_layout: "main".to_string(),
            error_view: "_error".to_string(),
            extension: "html".to_string(),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `sqlite::memory:`, `sqlite://path` or `sqlite:path`. Unset means no database.
    pub dsn: Option<String>,
}

/// Migration configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MigrationConfig {
    /// Directory holding `NNN_name.sql` files.
    pub path: String,

    /// Ledger table name.
    pub table: String,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            path: "migrations".to_string(),
            table: "migrations".to_string(),
        }
    }
}

/// Session configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    pub cookie_name: String,

    /// Session key whose presence marks the session as authenticated.
    pub user_key: String,

    /// Sessions untouched for this long are dropped.
    pub idle_timeout_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "session_id".to_string(),
            user_key: "user".to_string(),
            idle_timeout_secs: 1440,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level or filter directive (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.server.bind_address, "0.0.0.0:8080");
        assert_eq!(config.session.cookie_name, "session_id");
        assert_eq!(config.session.idle_timeout_secs, 1440);
        assert_eq!(config.migrations.table, "migrations");
        assert!(config.database.dsn.is_none());
    }

    #[test]
    fn test_partial_sections() {
        let config: AppConfig = toml::from_str(
            r#"
            [views]
            default_layout = "admin"

            [database]
            dsn = "sqlite::memory:"
            "#,
        )
        .unwrap();
        assert_eq!(config.views.default_layout, "admin");
        assert_eq!(config.views.extension, "html");
        assert_eq!(config.database.dsn.as_deref(), Some("sqlite::memory:"));
    }

    #[test]
    fn test_routes() {
        let config: AppConfig = toml::from_str(
            r#"
            [[routes]]
            path = "/"
            view = "home"

            [[routes]]
            method = "post"
            path = "/contact"
            view = "thanks"
            "#,
        )
        .unwrap();
        assert_eq!(config.routes.len(), 2);
        assert_eq!(config.routes[0].method, "get");
        assert_eq!(config.routes[1].view, "thanks");
    }
}
