#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use migration::MigratorTrait;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use server::{
    routes,
    state::{Integrations, ServerState},
};
use service::{
    checkout::mock::FakePaymentGateway,
    google::mock::StaticGoogleVerifier,
    mail::mock::RecordingMailer,
    shipping::{mock::StaticDirectory, City, Warehouse},
};

pub const ADMIN_EMAIL: &str = "admin@shop.test";
pub const PASSWORD: &str = "S3curePass!";
pub const GOOGLE_TOKEN: &str = "google-id-token";

pub struct TestApp {
    pub router: Router,
    pub db: DatabaseConnection,
    pub mailer: Arc<RecordingMailer>,
    pub payments: Arc<FakePaymentGateway>,
    pub shipping: Arc<StaticDirectory>,
    pub config: configs::AppConfig,
}

pub fn test_config() -> configs::AppConfig {
    let mut cfg = configs::AppConfig::default();
    cfg.database.url = "sqlite::memory:".into();
    cfg.auth.jwt_secret = "integration-test-secret-0123456789".into();
    cfg.auth.admin_emails = vec![ADMIN_EMAIL.into()];
    cfg.server.public_base_url = "http://shop.test".into();
    cfg.storage.images_dir = std::env::temp_dir()
        .join(format!("storefront-it-{}", Uuid::new_v4().simple()))
        .to_string_lossy()
        .into_owned();
    cfg.storage.max_image_bytes = 64 * 1024;
    cfg.mail.support_inbox = "support@shop.test".into();
    cfg
}

/// Router over a fresh in-memory database with fake external clients.
pub async fn spawn_app() -> anyhow::Result<TestApp> {
    let config = test_config();
    let mut opt = ConnectOptions::new("sqlite::memory:".to_owned());
    opt.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(opt).await?;
    migration::Migrator::up(&db, None).await?;

    let mailer = Arc::new(RecordingMailer::default());
    let payments = Arc::new(FakePaymentGateway::default());
    let shipping = Arc::new(StaticDirectory {
        cities: vec![City { city_ref: "kyiv-ref".into(), name: "Kyiv".into(), area: "Kyiv".into(), present: "Kyiv, Kyiv region".into() }],
        warehouses: vec![Warehouse { warehouse_ref: "wh-1".into(), number: "1".into(), description: "Branch No. 1".into(), short_address: "Main st. 1".into() }],
        ..StaticDirectory::default()
    });
    let integrations = Integrations {
        mailer: mailer.clone(),
        payments: payments.clone(),
        google: Arc::new(StaticGoogleVerifier::with(GOOGLE_TOKEN, "google.user@gmail.com", "Google User")),
        shipping: shipping.clone(),
    };
    let state = ServerState::new(db.clone(), &config, integrations);
    let router = routes::build_router(state, tower_http::cors::CorsLayer::very_permissive());
    Ok(TestApp { router, db, mailer, payments, shipping, config })
}

pub async fn read_json(resp: axum::response::Response) -> anyhow::Result<Value> {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await?;
    if bytes.is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

impl TestApp {
    pub async fn request(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> anyhow::Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(t) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {t}"));
        }
        let req = match body {
            Some(v) => builder.header(header::CONTENT_TYPE, "application/json").body(Body::from(serde_json::to_vec(&v)?))?,
            None => builder.body(Body::empty())?,
        };
        let resp = self.router.clone().oneshot(req).await?;
        let status = resp.status();
        Ok((status, read_json(resp).await?))
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> anyhow::Result<(StatusCode, Value)> {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> anyhow::Result<(StatusCode, Value)> {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    /// Register and sign in; returns the bearer token.
    pub async fn sign_up(&self, email: &str) -> anyhow::Result<String> {
        let (status, _) = self.post("/auth/register", None, json!({"email": email, "name": "Test Shopper", "password": PASSWORD})).await?;
        assert_eq!(status, StatusCode::OK, "register {email}");
        let (status, body) = self.post("/auth/login", None, json!({"email": email, "password": PASSWORD})).await?;
        assert_eq!(status, StatusCode::OK, "login {email}");
        let token = body["data"]["token"].as_str().ok_or_else(|| anyhow::anyhow!("no token in {body}"))?;
        Ok(token.to_string())
    }

    pub async fn admin_token(&self) -> anyhow::Result<String> {
        self.sign_up(ADMIN_EMAIL).await
    }

    /// Category plus one active product; returns the product id.
    pub async fn seed_product(&self, admin: &str, price_cents: i64, discount_percent: i32, stock: i32) -> anyhow::Result<String> {
        let (status, cat) = self
            .post("/categories", Some(admin), json!({"name": format!("Category {}", Uuid::new_v4().simple())}))
            .await?;
        assert_eq!(status, StatusCode::OK, "{cat}");
        let (status, product) = self
            .post(
                "/products",
                Some(admin),
                json!({
                    "category_id": cat["data"]["id"],
                    "name": format!("Lamp {}", Uuid::new_v4().simple()),
                    "description": "Desk lamp",
                    "price_cents": price_cents,
                    "discount_percent": discount_percent,
                    "stock": stock,
                }),
            )
            .await?;
        assert_eq!(status, StatusCode::OK, "{product}");
        Ok(product["data"]["id"].as_str().unwrap_or_default().to_string())
    }
}

pub fn shipping_json() -> Value {
    json!({"recipient_name": "Olena Shevchenko", "phone": "+380 44 123 4567", "city": "Kyiv", "warehouse": "Branch No. 1"})
}

/// Token from the `token=` query parameter of the first link in an email.
pub fn token_from_mail(html: &str) -> Option<String> {
    let start = html.find("token=")? + "token=".len();
    let token: String = html[start..].chars().take_while(char::is_ascii_alphanumeric).collect();
    (!token.is_empty()).then_some(token)
}
