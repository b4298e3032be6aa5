//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;
use tokio::net::TcpListener;

use webmvc::http::middleware::{AuthMiddleware, Middleware};
use webmvc::http::Response;
use webmvc::mvc::{Controller, ViewParams};
use webmvc::routing::Handler;
use webmvc::{AppConfig, AppError, Application, HttpServer, RequestContext, Shutdown};

/// Controller exercising params, forms, sessions and auth.
#[derive(Default)]
pub struct PostController;

impl Controller for PostController {
    fn middlewares(&self) -> Vec<Box<dyn Middleware>> {
        vec![Box::new(AuthMiddleware::new(["secret"]))]
    }

    fn invoke(&mut self, action: &str, ctx: &mut RequestContext<'_>) -> Result<Response, AppError> {
        match action {
            "show" => ctx.render("post", ViewParams::new()).map(Response::html),
            "echo" => {
                let msg = ctx.request.body().get("msg").cloned().unwrap_or_default();
                Ok(Response::html(msg))
            }
            "login" => {
                let user = ctx.request.body().get("user").cloned().unwrap_or_default();
                ctx.session.set("user", user);
                ctx.session.set_flash("success", "Logged in");
                Ok(ctx.redirect("/"))
            }
            "flash" => {
                let message = ctx.session.take_flash("success").unwrap_or_default();
                Ok(Response::html(message))
            }
            "secret" => Ok(Response::html("secret")),
            _ => Err(AppError::not_found()),
        }
    }
}

pub fn write_views(root: &Path) {
    let views = root.join("views");
    let layouts = views.join("layouts");
    fs::create_dir_all(&layouts).unwrap();
    fs::write(views.join("home.html"), "home").unwrap();
    fs::write(views.join("post.html"), "post {{slug}}").unwrap();
    fs::write(views.join("_error.html"), "{{code}}: {{message}}").unwrap();
    fs::write(layouts.join("main.html"), "<main>{{content}}</main>").unwrap();
}

pub fn test_config(dir: &TempDir) -> AppConfig {
    write_views(dir.path());
    let mut config = AppConfig::default();
    config.server.bind_address = "127.0.0.1:0".into();
    config.views.views_path = dir.path().join("views").display().to_string();
    config.views.layouts_path = dir.path().join("views/layouts").display().to_string();
    config
}

pub fn build_app(config: AppConfig) -> Arc<Application> {
    let app = Application::builder(config)
        .routes(|r| {
            r.get("/", Handler::view("home"))
                .get("/posts/{slug:[a-z-]+}", Handler::action::<PostController>("show"))
                .get("/echo", Handler::action::<PostController>("echo"))
                .post("/echo", Handler::action::<PostController>("echo"))
                .post("/login", Handler::action::<PostController>("login"))
                .get("/flash", Handler::action::<PostController>("flash"))
                .get("/secret", Handler::action::<PostController>("secret"));
        })
        .build()
        .unwrap();
    Arc::new(app)
}

/// Serve `app` on an ephemeral port until the returned `Shutdown` fires.
pub async fn start_server(app: Arc<Application>) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = HttpServer::new(app).run(listener, server_shutdown).await;
    });

    (addr, shutdown)
}

pub fn write_migration(dir: &Path, name: &str, up: &str, down: &str) {
    fs::write(
        dir.join(format!("{name}.sql")),
        format!("-- up\n{up}\n-- down\n{down}\n"),
    )
    .unwrap();
}
