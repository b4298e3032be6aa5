//! Dispatch results.
//!
//! # Responsibilities
//! - Represent a rendered page or a redirect instruction
//! - Convert into an axum response at the server edge
//!
//! # Design Decisions
//! - Redirects default to 302 Found and replace the previous Location
//! - Rendered pages are HTML with an explicit status

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::IntoResponse;

/// Result of dispatching a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Html { status: StatusCode, body: String },
    Redirect(Redirect),
}

/// Redirect instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub location: String,
    /// Replace any previously set Location header instead of adding another.
    pub replace: bool,
    pub status: StatusCode,
}

impl Redirect {
    pub fn to(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            replace: true,
            status: StatusCode::FOUND,
        }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn with_replace(mut self, replace: bool) -> Self {
        self.replace = replace;
        self
    }
}

impl Response {
    /// 200 OK with an HTML body.
    pub fn html(body: impl Into<String>) -> Self {
        Response::Html {
            status: StatusCode::OK,
            body: body.into(),
        }
    }

    pub fn html_with_status(status: StatusCode, body: impl Into<String>) -> Self {
        Response::Html {
            status,
            body: body.into(),
        }
    }

    /// 302 redirect to `location`.
    pub fn redirect(location: impl Into<String>) -> Self {
        Response::Redirect(Redirect::to(location))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Response::Html { status, .. } => *status,
            Response::Redirect(r) => r.status,
        }
    }

    pub fn body(&self) -> Option<&str> {
        match self {
            Response::Html { body, .. } => Some(body),
            Response::Redirect(_) => None,
        }
    }
}

impl IntoResponse for Response {
    fn into_response(self) -> axum::response::Response {
        match self {
            Response::Html { status, body } => (
                status,
                [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
                body,
            )
                .into_response(),
            Response::Redirect(redirect) => {
                let mut response = redirect.status.into_response();
                match HeaderValue::from_str(&redirect.location) {
                    Ok(value) => {
                        let headers = response.headers_mut();
                        if redirect.replace {
                            headers.insert(header::LOCATION, value);
                        } else {
                            headers.append(header::LOCATION, value);
                        }
                    }
                    Err(_) => {
                        tracing::warn!(location = %redirect.location, "Invalid redirect location");
                        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
                    }
                }
                response
            }
        }
    }
}
