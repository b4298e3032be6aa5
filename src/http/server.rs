//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with a catch-all dispatch handler
//! - Wire up middleware (tracing, timeout, body limit, request ID)
//! - Translate axum requests into framework requests and back
//! - Carry the session id in a cookie
//! - Run dispatch on a blocking worker
//! - Observability (metrics, correlation IDs)

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderValue, Request as HttpRequest, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    map_response_body::MapResponseBodyLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::app::Application;
use crate::http::request::Request;
use crate::observability::metrics;
use crate::routing::Method;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub app: Arc<Application>,
}

/// HTTP front end for an [`Application`].
pub struct HttpServer {
    router: Router,
    app: Arc<Application>,
}

impl HttpServer {
    pub fn new(app: Arc<Application>) -> Self {
        let router = Self::build_router(app.clone());
        Self { router, app }
    }

    /// The axum router, for serving or for driving with `oneshot`.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(app: Arc<Application>) -> Router {
        let server = &app.config().server;
        let timeout = Duration::from_secs(server.request_timeout_secs);
        let max_body = server.max_body_bytes;

        Router::new()
            .route("/{*path}", any(dispatch_handler))
            .route("/", any(dispatch_handler))
            .with_state(AppState { app })
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(TimeoutLayer::new(timeout))
                    .layer(MapResponseBodyLayer::new(Body::new))
                    .layer(RequestBodyLimitLayer::new(max_body)),
            )
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            routes = self.app.router().table().len(),
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Translate the request, run the application, translate the response.
async fn dispatch_handler(State(state): State<AppState>, request: HttpRequest<Body>) -> Response {
    let start_time = Instant::now();
    let (parts, body) = request.into_parts();
    let request_id = parts
        .headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let Some(method) = Method::from_http(&parts.method) else {
        tracing::debug!(request_id = %request_id, method = %parts.method, "Unsupported method");
        metrics::record_request(parts.method.as_str(), 405, start_time);
        return (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed").into_response();
    };

    let config = state.app.config();
    let body = match axum::body::to_bytes(body, config.server.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Failed to read request body");
            metrics::record_request(method.as_str(), 413, start_time);
            return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
        }
    };

    let uri = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let mut request = Request::new(method, uri).with_headers(parts.headers.clone());
    if method == Method::Post {
        request = request.with_form(&body);
    }

    let cookie_name = config.session.cookie_name.clone();
    let session_id = session_cookie(&parts.headers, &cookie_name);

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %request.path(),
        "Dispatching request"
    );

    let app = state.app.clone();
    let handled =
        tokio::task::spawn_blocking(move || app.handle(request, session_id.as_deref())).await;

    let (response, new_session) = match handled {
        Ok(handled) => handled,
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Dispatch task failed");
            metrics::record_request(method.as_str(), 500, start_time);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response();
        }
    };

    let mut response = response.into_response();
    if let Some(id) = new_session {
        match HeaderValue::from_str(&format!("{cookie_name}={id}; Path=/; HttpOnly; SameSite=Lax")) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(e) => tracing::warn!(error = %e, "Invalid session cookie"),
        }
    }

    metrics::record_request(method.as_str(), response.status().as_u16(), start_time);
    response
}

/// Value of the cookie called `name`, if the client sent one.
pub fn session_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; session_id=abc-123; lang=en"),
        );
        assert_eq!(session_cookie(&headers, "session_id").as_deref(), Some("abc-123"));
        assert_eq!(session_cookie(&headers, "missing"), None);
        assert_eq!(session_cookie(&HeaderMap::new(), "session_id"), None);
    }
}
