//! Framework error taxonomy.
//!
//! # Design Decisions
//! - One `AppError` crosses the request boundary; subsystems keep their own enums
//! - `Application::handle` is the only place errors are caught and rendered
//! - HTTP status is derived from the variant, never stored

use axum::http::StatusCode;

use crate::db::DbError;
use crate::http::request::sanitize_special_chars;
use crate::migrations::MigrationError;
use crate::routing::PatternError;

/// Errors surfaced while handling a request.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// No route matched, or a view/layout file is missing.
    #[error("{0}")]
    NotFound(String),

    /// A middleware denied the active action.
    #[error("{0}")]
    Forbidden(String),

    /// A route pattern could not be compiled.
    #[error(transparent)]
    Pattern(#[from] PatternError),

    /// Any database failure. Never recovered locally.
    #[error(transparent)]
    Persistence(#[from] DbError),

    #[error(transparent)]
    Migration(#[from] MigrationError),

    /// A view exists but could not be read.
    #[error("failed to read view '{view}': {source}")]
    View {
        view: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    /// `NotFound` with the default page message.
    pub fn not_found() -> Self {
        AppError::NotFound("Page not found".to_string())
    }

    /// `Forbidden` with the default page message.
    pub fn forbidden() -> Self {
        AppError::Forbidden("You don't have permission to access this page".to_string())
    }

    /// HTTP status this error is rendered with.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show in a page: escaped for client errors, generic
    /// for server errors, whose detail only goes to the log.
    pub fn public_message(&self) -> String {
        if self.status().is_server_error() {
            "Internal server error".to_string()
        } else {
            sanitize_special_chars(&self.to_string())
        }
    }
}
