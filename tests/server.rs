//! End-to-end tests against a live listener.

use reqwest::header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE};
use reqwest::redirect::Policy;
use reqwest::StatusCode;
use tempfile::TempDir;

mod common;

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(Policy::none())
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_session_survives_requests() {
    let dir = TempDir::new().unwrap();
    let (addr, shutdown) = common::start_server(common::build_app(common::test_config(&dir))).await;
    let base = format!("http://{addr}");
    let client = client();

    let res = client.get(format!("{base}/secret")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .post(format!("{base}/login"))
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body("user=ada")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(res.headers().get(LOCATION).unwrap(), "/");
    let cookie = res
        .headers()
        .get(SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .unwrap()
        .to_string();

    let res = client
        .get(format!("{base}/secret"))
        .header(COOKIE, &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "secret");

    shutdown.trigger();
}

#[tokio::test]
async fn test_flash_is_shown_once() {
    let dir = TempDir::new().unwrap();
    let (addr, shutdown) = common::start_server(common::build_app(common::test_config(&dir))).await;
    let base = format!("http://{addr}");
    let client = client();

    let res = client
        .post(format!("{base}/login"))
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body("user=ada")
        .send()
        .await
        .unwrap();
    let cookie = res
        .headers()
        .get(SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .unwrap()
        .to_string();

    let first = client
        .get(format!("{base}/flash"))
        .header(COOKIE, &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(first.text().await.unwrap(), "Logged in");

    let second = client
        .get(format!("{base}/flash"))
        .header(COOKIE, &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(second.text().await.unwrap(), "");

    shutdown.trigger();
}

#[tokio::test]
async fn test_concurrent_requests() {
    let dir = TempDir::new().unwrap();
    let (addr, shutdown) = common::start_server(common::build_app(common::test_config(&dir))).await;
    let client = client();

    let mut tasks = Vec::new();
    for i in 0..20 {
        let client = client.clone();
        let url = if i % 2 == 0 {
            format!("http://{addr}/")
        } else {
            format!("http://{addr}/posts/item")
        };
        tasks.push(tokio::spawn(async move {
            client.get(&url).send().await.unwrap().status()
        }));
    }

    for task in tasks {
        assert_eq!(task.await.unwrap(), StatusCode::OK);
    }

    shutdown.trigger();
}
