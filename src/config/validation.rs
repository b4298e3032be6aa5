//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Reject ledger table names that are not plain identifiers
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::AppConfig;
use crate::routing::{CompiledPattern, Method};
use crate::db::database::DbLocation;
use crate::db::record::is_identifier;

/// One semantic problem with a config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "server.bind_address",
            format!("'{}' is not a socket address", config.server.bind_address),
        ));
    }
    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "server.request_timeout_secs",
            "must be greater than zero",
        ));
    }
    if config.server.max_body_bytes == 0 {
        errors.push(ValidationError::new("server.max_body_bytes", "must be greater than zero"));
    }

    if config.session.idle_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "session.idle_timeout_secs",
            "must be greater than zero",
        ));
    }

    let paths = [
        ("views.views_path", &config.views.views_path),
        ("views.layouts_path", &config.views.layouts_path),
        ("views.default_layout", &config.views.default_layout),
        ("views.error_view", &config.views.error_view),
        ("migrations.path", &config.migrations.path),
        ("session.cookie_name", &config.session.cookie_name),
        ("session.user_key", &config.session.user_key),
    ];
    for (field, value) in paths {
        if value.trim().is_empty() {
            errors.push(ValidationError::new(field, "must not be empty"));
        }
    }

    if !is_identifier(&config.migrations.table) {
        errors.push(ValidationError::new(
            "migrations.table",
            format!("'{}' is not a valid table name", config.migrations.table),
        ));
    }

    if let Some(dsn) = &config.database.dsn {
        if DbLocation::parse(dsn).is_err() {
            errors.push(ValidationError::new(
                "database.dsn",
                format!("unsupported DSN '{dsn}'"),
            ));
        }
    }

    for route in &config.routes {
        if route.method.parse::<Method>().is_err() {
            errors.push(ValidationError::new(
                "routes.method",
                format!("unsupported method '{}' for '{}'", route.method, route.path),
            ));
        }
        if let Err(e) = CompiledPattern::compile(&route.path) {
            errors.push(ValidationError::new("routes.path", e.to_string()));
        }
        if route.view.trim().is_empty() {
            errors.push(ValidationError::new(
                "routes.view",
                format!("no view for '{}'", route.path),
            ));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
