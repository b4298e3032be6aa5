//! Application assembly and the per-request context.
//!
//! # Data Flow
//! ```text
//! ApplicationBuilder (config, routes, listeners, database)
//!     → build(): compile every route pattern, open the database
//!     → Arc<Application> shared by all workers
//!
//! Application::handle(request, session id)
//!     → load session, begin_request
//!     → RequestContext { app, request, session, active controller }
//!     → beforeRequest listeners → Router::resolve → afterRequest listeners
//!     → error? render error view at the error's status
//!     → end_request, store session
//! ```
//!
//! # Design Decisions
//! - No process-global application; the context carries `&Application`
//! - `handle` is the only catch boundary for request errors
//! - Dispatch is synchronous; the HTTP edge runs it on a blocking worker

use std::time::Duration;

use axum::http::StatusCode;

use crate::config::AppConfig;
use crate::db::Database;
use crate::error::AppError;
use crate::events::{Event, EventDispatcher};
use crate::http::request::Request;
use crate::http::response::Response;
use crate::mvc::view::{ViewParams, ViewRenderer};
use crate::routing::{Handler, Method, Router};
use crate::session::{Session, SessionStore};

/// Builds an [`Application`] at boot.
pub struct ApplicationBuilder {
    config: AppConfig,
    router: Router,
    events: EventDispatcher,
    db: Option<Database>,
}

impl ApplicationBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            router: Router::new(),
            events: EventDispatcher::new(),
            db: None,
        }
    }

    /// Register routes.
    pub fn routes<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&mut Router),
    {
        f(&mut self.router);
        self
    }

    /// Register the `[[routes]]` view routes from the config.
    pub fn config_routes(mut self) -> Self {
        for route in &self.config.routes {
            match route.method.parse::<Method>() {
                Ok(method) => {
                    self.router
                        .register(method, route.path.clone(), Handler::view(route.view.clone()));
                }
                Err(_) => tracing::warn!(method = %route.method, path = %route.path, "Skipping route"),
            }
        }
        self
    }

    pub fn router_mut(&mut self) -> &mut Router {
        &mut self.router
    }

    /// Register an event listener.
    pub fn on<F>(mut self, event: Event, listener: F) -> Self
    where
        F: Fn(&RequestContext<'_>) -> Result<(), AppError> + Send + Sync + 'static,
    {
        self.events.on(event, listener);
        self
    }

    /// Use `db` instead of opening `[database].dsn`.
    pub fn database(mut self, db: Database) -> Self {
        self.db = Some(db);
        self
    }

    /// Compile every route and open the configured database.
    pub fn build(self) -> Result<Application, AppError> {
        let compiled = self.router.compile_all()?;

        let db = match (self.db, &self.config.database.dsn) {
            (Some(db), _) => Some(db),
            (None, Some(dsn)) => Some(Database::open(dsn)?),
            (None, None) => None,
        };

        tracing::info!(
            routes = self.router.table().len(),
            patterns = compiled,
            database = db.is_some(),
            "Application built"
        );

        Ok(Application {
            views: ViewRenderer::new(&self.config.views),
            sessions: SessionStore::with_idle_timeout(Duration::from_secs(
                self.config.session.idle_timeout_secs,
            )),
            config: self.config,
            router: self.router,
            events: self.events,
            db,
        })
    }
}

/// The assembled application. Immutable once built.
pub struct Application {
    config: AppConfig,
    router: Router,
    views: ViewRenderer,
    sessions: SessionStore,
    events: EventDispatcher,
    db: Option<Database>,
}

impl Application {
    pub fn builder(config: AppConfig) -> ApplicationBuilder {
        ApplicationBuilder::new(config)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn views(&self) -> &ViewRenderer {
        &self.views
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn events(&self) -> &EventDispatcher {
        &self.events
    }

    pub fn db(&self) -> Option<&Database> {
        self.db.as_ref()
    }

    /// Handle one request.
    ///
    /// Returns the response and, when a new session was stored, the id
    /// the client should be given.
    pub fn handle(&self, request: Request, session_id: Option<&str>) -> (Response, Option<String>) {
        let mut session = self.sessions.load(session_id);
        session.begin_request();

        let mut ctx = RequestContext {
            app: self,
            request,
            session,
            active: None,
        };

        let response = match self.dispatch(&mut ctx) {
            Ok(response) => response,
            Err(err) => self.render_error(&ctx, &err),
        };

        let mut session = ctx.session;
        session.end_request();
        let id = session.id().to_string();
        let is_new = session.is_new();
        let stored = self.sessions.save(session);

        (response, (stored && is_new).then_some(id))
    }

    fn dispatch(&self, ctx: &mut RequestContext<'_>) -> Result<Response, AppError> {
        self.events.trigger(Event::BeforeRequest, ctx)?;
        let response = self.router.resolve(ctx)?;
        self.events.trigger(Event::AfterRequest, ctx)?;
        Ok(response)
    }

    fn render_error(&self, ctx: &RequestContext<'_>, err: &AppError) -> Response {
        let status = err.status();
        if status.is_server_error() {
            tracing::error!(path = %ctx.request.path(), error = %err, "Request failed");
        } else {
            tracing::info!(path = %ctx.request.path(), status = status.as_u16(), error = %err, "Request rejected");
        }

        let params = ViewParams::from([
            ("code".to_string(), status.as_u16().to_string()),
            ("message".to_string(), err.public_message()),
        ]);
        match self.views.render_partial(&self.config.views.error_view, &params) {
            Ok(body) => Response::html_with_status(status, body),
            Err(view_err) => {
                tracing::warn!(error = %view_err, "Error view failed to render");
                Response::html_with_status(status, plain_error(status, err))
            }
        }
    }
}

fn plain_error(status: StatusCode, err: &AppError) -> String {
    format!("{} {}", status.as_u16(), err.public_message())
}

/// The controller and action being dispatched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveController {
    controller: String,
    action: String,
    layout: Option<String>,
}

impl ActiveController {
    pub fn new(controller: &str, action: &str, layout: Option<String>) -> Self {
        Self {
            controller: controller.to_string(),
            action: action.to_string(),
            layout,
        }
    }

    pub fn name(&self) -> &str {
        &self.controller
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn layout(&self) -> Option<&str> {
        self.layout.as_deref()
    }
}

/// Everything a handler can see while serving one request.
pub struct RequestContext<'a> {
    app: &'a Application,
    pub request: Request,
    pub session: Session,
    active: Option<ActiveController>,
}

impl<'a> RequestContext<'a> {
    pub fn app(&self) -> &'a Application {
        self.app
    }

    /// Render `view` in the active controller's layout.
    ///
    /// Route params are available to the view; explicit `params` win on
    /// a name clash.
    pub fn render(&self, view: &str, params: ViewParams) -> Result<String, AppError> {
        let layout = self.active.as_ref().and_then(ActiveController::layout);
        self.app.views.render(view, &self.merge(params), layout)
    }

    /// Render `view` without a layout.
    pub fn render_partial(&self, view: &str, params: ViewParams) -> Result<String, AppError> {
        self.app.views.render_partial(view, &self.merge(params))
    }

    pub fn redirect(&self, location: impl Into<String>) -> Response {
        Response::redirect(location)
    }

    /// True when the session holds the configured user key.
    pub fn is_authenticated(&self) -> bool {
        self.session
            .get(&self.app.config.session.user_key)
            .is_some_and(|v| !v.is_null())
    }

    pub fn db(&self) -> Result<&'a Database, AppError> {
        self.app
            .db
            .as_ref()
            .ok_or_else(|| AppError::Internal("no database configured".to_string()))
    }

    pub fn set_active_controller(&mut self, active: ActiveController) {
        self.active = Some(active);
    }

    pub fn active_controller(&self) -> Option<&ActiveController> {
        self.active.as_ref()
    }

    fn merge(&self, params: ViewParams) -> ViewParams {
        let mut merged: ViewParams = self
            .request
            .route_params()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        merged.extend(params);
        merged
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use tempfile::TempDir;

    use super::*;
    use crate::http::middleware::{AuthMiddleware, Middleware};
    use crate::mvc::Controller;

    #[derive(Default)]
    struct UserController;

    impl Controller for UserController {
        fn layout(&self) -> Option<&str> {
            Some("admin")
        }

        fn middlewares(&self) -> Vec<Box<dyn Middleware>> {
            vec![Box::new(AuthMiddleware::new(["edit"]))]
        }

        fn invoke(&mut self, action: &str, ctx: &mut RequestContext<'_>) -> Result<Response, AppError> {
            match action {
                "show" => ctx.render("user", ViewParams::new()).map(Response::html),
                "edit" => Ok(Response::html("editing")),
                "gone" => Err(AppError::NotFound("<b>gone</b>".into())),
                "broken" => Err(AppError::Internal("no such table: users".into())),
                "login" => {
                    let user = ctx.request.body().get("user").cloned().unwrap_or_default();
                    ctx.session.set("user", user);
                    ctx.session.set_flash("success", "Welcome");
                    Ok(ctx.redirect("/"))
                }
                _ => Err(AppError::not_found()),
            }
        }
    }

    thread_local! {
        static TRAIL: std::cell::RefCell<Vec<&'static str>> = const { std::cell::RefCell::new(Vec::new()) };
    }

    fn trail() -> Vec<&'static str> {
        TRAIL.with(|t| t.borrow_mut().drain(..).collect())
    }

    /// Records itself, then denies when `?deny=` names it.
    struct Recording(&'static str);

    impl Middleware for Recording {
        fn execute(&self, ctx: &RequestContext<'_>) -> Result<(), AppError> {
            TRAIL.with(|t| t.borrow_mut().push(self.0));
            if ctx.request.query_param("deny") == Some(self.0) {
                return Err(AppError::forbidden());
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct GuardedController;

    impl Controller for GuardedController {
        fn middlewares(&self) -> Vec<Box<dyn Middleware>> {
            vec![Box::new(Recording("first")), Box::new(Recording("second"))]
        }

        fn invoke(&mut self, _action: &str, _ctx: &mut RequestContext<'_>) -> Result<Response, AppError> {
            TRAIL.with(|t| t.borrow_mut().push("action"));
            Ok(Response::html("ran"))
        }
    }

    fn config(dir: &TempDir) -> AppConfig {
        let views = dir.path().join("views");
        let layouts = views.join("layouts");
        fs::create_dir_all(&layouts).unwrap();
        fs::write(views.join("home.html"), "home").unwrap();
        fs::write(views.join("user.html"), "user {{id}}").unwrap();
        fs::write(views.join("_error.html"), "{{code}}: {{message}}").unwrap();
        fs::write(layouts.join("main.html"), "<main>{{content}}</main>").unwrap();
        fs::write(layouts.join("admin.html"), "<admin>{{content}}</admin>").unwrap();

        let mut config = AppConfig::default();
        config.views.views_path = views.display().to_string();
        config.views.layouts_path = layouts.display().to_string();
        config
    }

    fn app(dir: &TempDir) -> Application {
        Application::builder(config(dir))
            .routes(|r| {
                r.get("/", Handler::view("home"))
                    .get("/users/{id:\\d+}", Handler::action::<UserController>("show"))
                    .get("/users/{id}/edit", Handler::action::<UserController>("edit"))
                    .post("/login", Handler::action::<UserController>("login"))
                    .get("/guarded", Handler::action::<GuardedController>("run"))
                    .get("/gone", Handler::action::<UserController>("gone"))
                    .get("/broken", Handler::action::<UserController>("broken"));
            })
            .build()
            .unwrap()
    }

    fn get(path: &str) -> Request {
        Request::new(Method::Get, path)
    }

    #[test]
    fn test_view_route_uses_default_layout() {
        let dir = TempDir::new().unwrap();
        let (response, cookie) = app(&dir).handle(get("/"), None);
        assert_eq!(response, Response::html("<main>home</main>"));
        assert_eq!(cookie, None);
    }

    #[test]
    fn test_action_renders_route_params_in_controller_layout() {
        let dir = TempDir::new().unwrap();
        let (response, _) = app(&dir).handle(get("/users/42"), None);
        assert_eq!(response.body(), Some("<admin>user 42</admin>"));
    }

    #[test]
    fn test_not_found_renders_error_view() {
        let dir = TempDir::new().unwrap();
        let (response, _) = app(&dir).handle(get("/nope"), None);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.body(), Some("404: Page not found"));
    }

    #[test]
    fn test_missing_error_view_falls_back_to_text() {
        let dir = TempDir::new().unwrap();
        let mut config = config(&dir);
        config.views.error_view = "missing".into();
        let app = Application::builder(config).build().unwrap();

        let (response, _) = app.handle(get("/"), None);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.body(), Some("404 Page not found"));
    }

    #[test]
    fn test_auth_middleware_and_login_session() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir);

        let (response, _) = app.handle(get("/users/7/edit"), None);
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            response.body(),
            Some("403: You don't have permission to access this page")
        );

        let login = Request::new(Method::Post, "/login").with_form(b"user=ada");
        let (response, cookie) = app.handle(login, None);
        assert_eq!(response, Response::redirect("/"));
        let id = cookie.expect("new session should be stored");

        let (response, cookie) = app.handle(get("/users/7/edit"), Some(id.as_str()));
        assert_eq!(response.body(), Some("editing"));
        assert_eq!(cookie, None);

        let mut session = app.sessions().load(Some(id.as_str()));
        session.begin_request();
        assert_eq!(session.take_flash("success"), None);
    }

    #[test]
    fn test_error_messages_are_escaped_or_hidden() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir);

        let (response, _) = app.handle(get("/gone"), None);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.body(), Some("404: &#60;b&#62;gone&#60;/b&#62;"));

        let (response, _) = app.handle(get("/broken"), None);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.body(), Some("500: Internal server error"));
    }

    #[test]
    fn test_middlewares_run_in_order_before_action() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir);
        trail();

        let (response, _) = app.handle(get("/guarded"), None);
        assert_eq!(response.body(), Some("ran"));
        assert_eq!(trail(), vec!["first", "second", "action"]);
    }

    #[test]
    fn test_denying_middleware_stops_dispatch() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir);
        trail();

        let (response, _) = app.handle(get("/guarded?deny=first"), None);
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(trail(), vec!["first"]);

        let (response, _) = app.handle(get("/guarded?deny=second"), None);
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(trail(), vec!["first", "second"]);
    }

    #[test]
    fn test_listeners_run_in_order_and_can_abort() {
        let dir = TempDir::new().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let first = calls.clone();
        let second = calls.clone();

        let app = Application::builder(config(&dir))
            .routes(|r| {
                r.get("/", Handler::view("home"));
            })
            .on(Event::BeforeRequest, move |_| {
                assert_eq!(first.fetch_add(1, Ordering::SeqCst), 0);
                Ok(())
            })
            .on(Event::AfterRequest, move |ctx| {
                second.fetch_add(1, Ordering::SeqCst);
                if ctx.request.query_param("fail").is_some() {
                    return Err(AppError::Internal("listener refused".into()));
                }
                Ok(())
            })
            .build()
            .unwrap();

        let (response, _) = app.handle(get("/"), None);
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(app.events().listener_count(Event::BeforeRequest), 1);

        calls.store(0, Ordering::SeqCst);
        let (response, _) = app.handle(get("/?fail=1"), None);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.body(), Some("500: Internal server error"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_invalid_pattern_fails_build() {
        let dir = TempDir::new().unwrap();
        let result = Application::builder(config(&dir))
            .routes(|r| {
                r.get("/bad/{id:(}", Handler::view("home"));
            })
            .build();
        assert!(matches!(result, Err(AppError::Pattern(_))));
    }

    #[test]
    fn test_config_routes() {
        let dir = TempDir::new().unwrap();
        let mut config = config(&dir);
        config.routes = vec![crate::config::RouteConfig {
            method: "get".into(),
            path: "/welcome".into(),
            view: "home".into(),
        }];
        let app = Application::builder(config).config_routes().build().unwrap();

        let (response, _) = app.handle(get("/welcome"), None);
        assert_eq!(response.body(), Some("<main>home</main>"));
    }

    #[test]
    fn test_db_requires_configuration() {
        let dir = TempDir::new().unwrap();
        let app = Application::builder(config(&dir))
            .database(Database::open_in_memory().unwrap())
            .build()
            .unwrap();
        assert!(app.db().is_some());

        let bare = Application::builder(config(&dir)).build().unwrap();
        assert!(bare.db().is_none());
    }
}
