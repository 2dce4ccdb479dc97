mod common;

use std::net::SocketAddr;

use reqwest::StatusCode as HttpStatusCode;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use common::{shipping_json, spawn_app, PASSWORD};

struct TestServer {
    base_url: String,
}

async fn start_server() -> anyhow::Result<(TestServer, common::TestApp)> {
    let app = spawn_app().await?;
    let listener = TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await?;
    let addr: SocketAddr = listener.local_addr()?;
    let router = app.router.clone();
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            eprintln!("server error: {}", e);
        }
    });
    Ok((TestServer { base_url: format!("http://{}", addr) }, app))
}

#[tokio::test]
async fn browser_session_shops_with_cookie_auth() -> anyhow::Result<()> {
    let (server, app) = start_server().await?;
    let admin = app.admin_token().await?;
    let product = app.seed_product(&admin, 4_990, 20, 2).await?;

    let client = reqwest::Client::builder().cookie_store(true).build()?;
    let url = |path: &str| format!("{}{}", server.base_url, path);

    let resp = client
        .post(url("/auth/register"))
        .json(&json!({"email": "browser@example.com", "name": "Browser", "password": PASSWORD}))
        .send()
        .await?;
    assert_eq!(resp.status(), HttpStatusCode::OK);

    let resp = client.get(url("/account/me")).send().await?;
    assert_eq!(resp.status(), HttpStatusCode::UNAUTHORIZED);

    let resp = client
        .post(url("/auth/login"))
        .json(&json!({"email": "browser@example.com", "password": PASSWORD}))
        .send()
        .await?;
    assert_eq!(resp.status(), HttpStatusCode::OK);

    let me: Value = client.get(url("/account/me")).send().await?.json().await?;
    assert_eq!(me["data"]["email"], "browser@example.com");

    let resp = client
        .post(url("/orders"))
        .json(&json!({"items": [{"product_id": product, "quantity": 1}], "shipping": shipping_json()}))
        .send()
        .await?;
    assert_eq!(resp.status(), HttpStatusCode::OK);
    let order: Value = resp.json().await?;
    assert_eq!(order["data"]["total_cents"], 3_992);

    let resp = client.post(url("/auth/logout")).send().await?;
    assert_eq!(resp.status(), HttpStatusCode::OK);
    let resp = client.get(url("/orders")).send().await?;
    assert_eq!(resp.status(), HttpStatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn swagger_ui_is_served() -> anyhow::Result<()> {
    let (server, _app) = start_server().await?;
    let resp = reqwest::get(format!("{}/docs/", server.base_url)).await?;
    assert_eq!(resp.status(), HttpStatusCode::OK);
    let resp = reqwest::get(format!("{}/health", server.base_url)).await?;
    let body: Value = resp.json().await?;
    assert_eq!(body["status"], "ok");
    Ok(())
}
