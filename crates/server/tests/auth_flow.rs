mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use serde_json::json;
use tower::ServiceExt;

use common::{spawn_app, token_from_mail, GOOGLE_TOKEN, PASSWORD};

#[tokio::test]
async fn health_and_openapi_are_public() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let (status, body) = app.get("/health", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));

    let (status, doc) = app.get("/api-docs/openapi.json", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"]["/orders"].is_object());
    Ok(())
}

#[tokio::test]
async fn register_confirm_and_login_with_cookie() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let (status, body) = app
        .post("/auth/register", None, json!({"email": "Jane@Example.com", "name": "Jane", "password": PASSWORD}))
        .await?;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["email"], "jane@example.com");
    assert_eq!(body["data"]["role"], "customer");
    assert_eq!(body["data"]["email_confirmed"], false);

    let sent = app.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "jane@example.com");
    let token = token_from_mail(&sent[0].html).expect("confirmation link");

    let (status, body) = app.get(&format!("/auth/confirm-email?token={token}"), None).await?;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["email_confirmed"], true);
    let (status, body) = app.post("/auth/confirm-email", None, json!({"token": token})).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let req = Request::builder()
        .method(Method::POST)
        .uri("/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&json!({"email": "jane@example.com", "password": PASSWORD}))?))?;
    let resp = app.router.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let cookie = resp
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .expect("auth cookie");
    assert!(cookie.starts_with("auth_token="));
    assert!(cookie.contains("HttpOnly"));
    let pair = cookie.split(';').next().unwrap_or_default().to_string();

    let req = Request::builder().uri("/account/me").header(header::COOKIE, pair).body(Body::empty())?;
    let resp = app.router.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let me = common::read_json(resp).await?;
    assert_eq!(me["data"]["email"], "jane@example.com");
    Ok(())
}

#[tokio::test]
async fn duplicate_email_and_bad_password_are_rejected() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    app.sign_up("dup@example.com").await?;
    let (status, body) = app
        .post("/auth/register", None, json!({"email": "dup@example.com", "name": "Again", "password": PASSWORD}))
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);

    let (status, body) = app.post("/auth/login", None, json!({"email": "dup@example.com", "password": "wrong-password"})).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["message"].as_str().unwrap_or_default().contains("invalid credentials"));

    let (status, _) = app
        .post("/auth/register", None, json!({"email": "short@example.com", "name": "Short", "password": "123"}))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn guards_distinguish_anonymous_customer_and_admin() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let (status, _) = app.get("/account/me", None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app.get("/account/me", Some("not-a-jwt")).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let customer = app.sign_up("customer@example.com").await?;
    let (status, body) = app.get("/admin/users", Some(&customer)).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], false);
    let (status, _) = app.post("/categories", Some(&customer), json!({"name": "Nope"})).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let admin = app.admin_token().await?;
    let (status, body) = app.get("/admin/users?page=1&per_page=10", Some(&admin)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 2);
    assert_eq!(body["data"]["per_page"], 10);
    Ok(())
}

#[tokio::test]
async fn disabled_user_cannot_sign_in() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let admin = app.admin_token().await?;
    let old_token = app.sign_up("blocked@example.com").await?;
    let (_, users) = app.get("/admin/users", Some(&admin)).await?;
    let id = users["data"]["items"]
        .as_array()
        .and_then(|items| items.iter().find(|u| u["email"] == "blocked@example.com"))
        .map(|u| u["id"].as_str().unwrap_or_default().to_string())
        .expect("listed user");

    let (status, body) = app
        .request(Method::PUT, &format!("/admin/users/{id}/status"), Some(&admin), Some(json!({"status": "disabled"})))
        .await?;
    assert_eq!(status, StatusCode::OK, "{body}");
    let (status, _) = app.post("/auth/login", None, json!({"email": "blocked@example.com", "password": PASSWORD})).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // tokens issued before the account was disabled stop working at once
    let (status, body) = app.get("/account/me", Some(&old_token)).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED, "{body}");
    assert_eq!(body["success"], false);
    let (status, _) = app.get("/orders", Some(&old_token)).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .request(Method::PUT, &format!("/admin/users/{id}/status"), Some(&admin), Some(json!({"status": "active"})))
        .await?;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.get("/account/me", Some(&old_token)).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn profile_update_and_password_change() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let token = app.sign_up("profile@example.com").await?;
    let (status, body) = app
        .request(Method::PUT, "/account/me", Some(&token), Some(json!({"name": "New Name", "phone": "+380 67 000 1122"})))
        .await?;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["name"], "New Name");
    assert_eq!(body["data"]["phone"], "+380 67 000 1122");

    let (status, _) = app
        .post("/account/change-password", Some(&token), json!({"current_password": "wrong-one!", "new_password": "An0therPass"}))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app
        .post("/account/change-password", Some(&token), json!({"current_password": PASSWORD, "new_password": "An0therPass"}))
        .await?;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.post("/auth/login", None, json!({"email": "profile@example.com", "password": "An0therPass"})).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn forgot_and_reset_password() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    app.sign_up("forgetful@example.com").await?;
    let (status, _) = app.post("/auth/forgot-password", None, json!({"email": "nobody@example.com"})).await?;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.post("/auth/forgot-password", None, json!({"email": "forgetful@example.com"})).await?;
    assert_eq!(status, StatusCode::OK);

    let sent = app.mailer.sent();
    let reset = sent.iter().rev().find(|m| m.html.contains("reset-password")).expect("reset mail");
    assert_eq!(reset.to, "forgetful@example.com");
    let token = token_from_mail(&reset.html).expect("reset token");

    let (status, _) = app.post("/auth/reset-password", None, json!({"token": token, "new_password": "Fresh-Pass-1"})).await?;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.post("/auth/reset-password", None, json!({"token": token, "new_password": "Other-Pass-2"})).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.post("/auth/login", None, json!({"email": "forgetful@example.com", "password": "Fresh-Pass-1"})).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn google_login_creates_confirmed_account() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let (status, body) = app.post("/auth/google", None, json!({"id_token": GOOGLE_TOKEN})).await?;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["user"]["email"], "google.user@gmail.com");
    assert_eq!(body["data"]["user"]["email_confirmed"], true);
    let token = body["data"]["token"].as_str().unwrap_or_default().to_string();
    let (status, _) = app.get("/account/me", Some(&token)).await?;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.post("/auth/google", None, json!({"id_token": "forged"})).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn logout_clears_cookie() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let req = Request::builder()
        .method(Method::POST)
        .uri("/auth/logout")
        .header(header::COOKIE, "auth_token=stale")
        .body(Body::empty())?;
    let resp = app.router.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let cookie = resp.headers().get(header::SET_COOKIE).and_then(|v| v.to_str().ok()).unwrap_or_default();
    assert!(cookie.starts_with("auth_token="));
    assert!(cookie.contains("Max-Age=0"));
    Ok(())
}
