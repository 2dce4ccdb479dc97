//! Stripe Checkout: building hosted payment sessions for orders and
//! confirming them by reading the session back.

use std::time::Duration;

use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use models::{order::{OrderStatus, PaymentStatus}, order_item};
use crate::auth::domain::CurrentUser;
use crate::errors::ServiceError;
use crate::order_service;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionLine {
    pub name: String,
    pub unit_amount: i64,
    pub quantity: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRequest {
    pub order_id: Uuid,
    pub currency: String,
    pub success_url: String,
    pub cancel_url: String,
    pub lines: Vec<SessionLine>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub session_id: String,
    pub url: String,
}

/// The parts of a retrieved Checkout Session this service relies on.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionStatus {
    pub id: String,
    pub payment_status: String,
    pub client_reference_id: Option<String>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_session(&self, req: &SessionRequest) -> Result<CheckoutSession, ServiceError>;
    async fn retrieve_session(&self, session_id: &str) -> Result<SessionStatus, ServiceError>;
}

/// Settings applied to every session.
#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    pub currency: String,
    pub success_url: String,
    pub cancel_url: String,
}

impl CheckoutSettings {
    pub fn from_config(cfg: &configs::StripeConfig) -> Self {
        Self { currency: cfg.currency.to_lowercase(), success_url: cfg.success_url.clone(), cancel_url: cfg.cancel_url.clone() }
    }
}

/// One session line per order line at `floor(line_total / quantity)`; the
/// cents lost to that division go on a single "Rounding" line so the session
/// total equals the order total.
pub fn session_lines(items: &[order_item::Model]) -> Vec<SessionLine> {
    let mut lines = Vec::with_capacity(items.len() + 1);
    let mut remainder = 0i64;
    for item in items {
        let qty = item.quantity.max(1) as i64;
        let unit = item.line_total_cents / qty;
        remainder += item.line_total_cents - unit * qty;
        lines.push(SessionLine { name: item.product_name.clone(), unit_amount: unit, quantity: item.quantity });
    }
    if remainder > 0 {
        lines.push(SessionLine { name: "Rounding".into(), unit_amount: remainder, quantity: 1 });
    }
    lines
}

/// Stripe's bracketed form encoding of a session request.
pub fn form_params(req: &SessionRequest) -> Vec<(String, String)> {
    let order_id = req.order_id.to_string();
    let mut params = vec![
        ("mode".to_string(), "payment".to_string()),
        ("success_url".to_string(), req.success_url.clone()),
        ("cancel_url".to_string(), req.cancel_url.clone()),
        ("client_reference_id".to_string(), order_id.clone()),
        ("metadata[order_id]".to_string(), order_id),
    ];
    for (i, line) in req.lines.iter().enumerate() {
        let key = |k: &str| format!("line_items[{}]{}", i, k);
        params.push((key("[price_data][currency]"), req.currency.clone()));
        params.push((key("[price_data][product_data][name]"), line.name.clone()));
        params.push((key("[price_data][unit_amount]"), line.unit_amount.to_string()));
        params.push((key("[quantity]"), line.quantity.to_string()));
    }
    params
}

/// Start a hosted payment for an unpaid, still-open order of `customer`.
#[instrument(skip(db, gateway, settings), fields(user_id = %customer.id))]
pub async fn create_session(
    db: &DatabaseConnection,
    gateway: &dyn PaymentGateway,
    settings: &CheckoutSettings,
    customer: &CurrentUser,
    order_id: Uuid,
) -> Result<CheckoutSession, ServiceError> {
    let dto = order_service::get(db, customer, order_id).await?;
    if dto.order.user_id != customer.id {
        return Err(ServiceError::Forbidden("only the customer can pay for an order".into()));
    }
    if !matches!(dto.order.status, OrderStatus::Pending | OrderStatus::Processing) {
        return Err(ServiceError::Validation(format!("order is {}", dto.order.status.as_str())));
    }
    if dto.order.payment_status != PaymentStatus::Unpaid {
        return Err(ServiceError::Validation("order is already paid".into()));
    }
    if dto.order.total_cents <= 0 {
        return Err(ServiceError::Validation("order total must be positive".into()));
    }
    let req = SessionRequest {
        order_id,
        currency: settings.currency.clone(),
        success_url: settings.success_url.clone(),
        cancel_url: settings.cancel_url.clone(),
        lines: session_lines(&dto.items),
    };
    let session = gateway.create_session(&req).await?;
    order_service::attach_checkout_session(db, dto.order, &session.session_id).await?;
    info!(order_id = %order_id, session_id = %session.session_id, "checkout_session_created");
    Ok(session)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfirmOutcome {
    pub order_id: Uuid,
    pub paid: bool,
}

/// Stripe checkout session ids look like `cs_test_a1B2...`; anything else is
/// refused before it reaches a request path.
pub fn validate_session_id(session_id: &str) -> Result<(), ServiceError> {
    let well_formed = session_id.len() <= 255
        && session_id
            .strip_prefix("cs_")
            .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
    if !well_formed {
        return Err(ServiceError::Validation("malformed checkout session id".into()));
    }
    Ok(())
}

/// Re-read the session from Stripe and mark its order paid once Stripe says so.
#[instrument(skip(db, gateway), fields(user_id = %customer.id))]
pub async fn confirm(
    db: &DatabaseConnection,
    gateway: &dyn PaymentGateway,
    customer: &CurrentUser,
    session_id: &str,
) -> Result<ConfirmOutcome, ServiceError> {
    validate_session_id(session_id)?;
    let status = gateway.retrieve_session(session_id).await?;
    let order_id = status
        .client_reference_id
        .as_deref()
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| ServiceError::Upstream("checkout session carries no order reference".into()))?;
    let dto = order_service::get(db, customer, order_id).await?;
    if dto.order.stripe_session_id.as_deref() != Some(session_id) {
        warn!(order_id = %order_id, session_id, "session does not belong to order");
        return Err(ServiceError::Validation("checkout session does not match the order".into()));
    }
    if status.payment_status != "paid" {
        return Ok(ConfirmOutcome { order_id, paid: dto.order.payment_status == PaymentStatus::Paid });
    }
    order_service::mark_paid(db, order_id).await?;
    Ok(ConfirmOutcome { order_id, paid: true })
}

/// Stripe REST client (`/v1/checkout/sessions`).
pub struct StripeClient {
    client: reqwest::Client,
    api_base: String,
    secret_key: String,
}

#[derive(Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Deserialize)]
struct StripeErrorDetail {
    message: Option<String>,
}

#[derive(Deserialize)]
struct CreatedSession {
    id: String,
    url: Option<String>,
}

impl StripeClient {
    pub fn new(cfg: &configs::StripeConfig) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        Ok(Self { client, api_base: cfg.api_base.trim_end_matches('/').to_string(), secret_key: cfg.secret_key.clone() })
    }

    async fn read<T: for<'de> Deserialize<'de>>(resp: reqwest::Response) -> Result<T, ServiceError> {
        let status = resp.status();
        let body = resp.text().await.map_err(|e| ServiceError::Upstream(format!("stripe: {e}")))?;
        if !status.is_success() {
            let msg = serde_json::from_str::<StripeErrorBody>(&body)
                .ok()
                .and_then(|b| b.error.message)
                .unwrap_or_else(|| format!("status {}", status));
            return Err(ServiceError::Upstream(format!("stripe: {}", msg)));
        }
        serde_json::from_str(&body).map_err(|e| ServiceError::Upstream(format!("stripe: unexpected response: {e}")))
    }
}

#[async_trait]
impl PaymentGateway for StripeClient {
    async fn create_session(&self, req: &SessionRequest) -> Result<CheckoutSession, ServiceError> {
        if self.secret_key.is_empty() {
            return Err(ServiceError::Upstream("stripe is not configured".into()));
        }
        let resp = self.client
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(&form_params(req))
            .send()
            .await
            .map_err(|e| ServiceError::Upstream(format!("stripe: {e}")))?;
        let created: CreatedSession = Self::read(resp).await?;
        Ok(CheckoutSession { url: created.url.unwrap_or_default(), session_id: created.id })
    }

    async fn retrieve_session(&self, session_id: &str) -> Result<SessionStatus, ServiceError> {
        validate_session_id(session_id)?;
        let resp = self.client
            .get(format!("{}/v1/checkout/sessions/{}", self.api_base, session_id))
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| ServiceError::Upstream(format!("stripe: {e}")))?;
        Self::read(resp).await
    }
}

pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Gateway keeping sessions in memory; `pay` flips a session to paid.
    #[derive(Default)]
    pub struct FakePaymentGateway {
        sessions: Mutex<HashMap<String, (SessionRequest, bool)>>,
    }

    impl FakePaymentGateway {
        pub fn pay(&self, session_id: &str) {
            if let Ok(mut s) = self.sessions.lock() {
                if let Some(entry) = s.get_mut(session_id) { entry.1 = true; }
            }
        }

        pub fn request(&self, session_id: &str) -> Option<SessionRequest> {
            self.sessions.lock().ok()?.get(session_id).map(|(r, _)| r.clone())
        }
    }

    #[async_trait]
    impl PaymentGateway for FakePaymentGateway {
        async fn create_session(&self, req: &SessionRequest) -> Result<CheckoutSession, ServiceError> {
            let id = format!("cs_test_{}", Uuid::new_v4().simple());
            self.sessions.lock().map_err(|e| ServiceError::Internal(e.to_string()))?.insert(id.clone(), (req.clone(), false));
            Ok(CheckoutSession { url: format!("https://checkout.stripe.test/{}", id), session_id: id })
        }

        async fn retrieve_session(&self, session_id: &str) -> Result<SessionStatus, ServiceError> {
            let sessions = self.sessions.lock().map_err(|e| ServiceError::Internal(e.to_string()))?;
            let (req, paid) = sessions.get(session_id).ok_or_else(|| ServiceError::Upstream(format!("stripe: no such checkout.session: '{}'", session_id)))?;
            Ok(SessionStatus {
                id: session_id.to_string(),
                payment_status: if *paid { "paid".into() } else { "unpaid".into() },
                client_reference_id: Some(req.order_id.to_string()),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::mock::FakePaymentGateway;
    use crate::mail::mock::RecordingMailer;
    use crate::order_service::{CreateOrderInput, OrderLineInput};
    use crate::test_support::{get_db, seed_category, seed_product, seed_user};
    use models::{order::ShippingInfo, user::UserRole};

    fn item(name: &str, qty: i32, total: i64) -> order_item::Model {
        order_item::Model {
            id: Uuid::new_v4(),
            order_id: Uuid::nil(),
            product_id: Uuid::new_v4(),
            product_name: name.into(),
            unit_price_cents: 0,
            discount_percent: 0,
            quantity: qty,
            line_total_cents: total,
        }
    }

    #[test]
    fn rounding_line_keeps_session_total_exact() {
        let lines = session_lines(&[item("Chips", 3, 1000), item("Soda", 2, 500)]);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].unit_amount, 333);
        assert_eq!(lines[2], SessionLine { name: "Rounding".into(), unit_amount: 1, quantity: 1 });
        let total: i64 = lines.iter().map(|l| l.unit_amount * l.quantity as i64).sum();
        assert_eq!(total, 1500);
    }

    #[test]
    fn no_rounding_line_when_division_is_exact() {
        assert_eq!(session_lines(&[item("Soda", 2, 500)]).len(), 1);
    }

    #[test]
    fn form_params_use_bracketed_keys() {
        let req = SessionRequest {
            order_id: Uuid::nil(),
            currency: "usd".into(),
            success_url: "https://s".into(),
            cancel_url: "https://c".into(),
            lines: vec![SessionLine { name: "Soda".into(), unit_amount: 250, quantity: 2 }],
        };
        let params = form_params(&req);
        let get = |k: &str| params.iter().find(|(key, _)| key == k).map(|(_, v)| v.as_str());
        assert_eq!(get("mode"), Some("payment"));
        assert_eq!(get("client_reference_id"), Some("00000000-0000-0000-0000-000000000000"));
        assert_eq!(get("metadata[order_id]"), Some("00000000-0000-0000-0000-000000000000"));
        assert_eq!(get("line_items[0][price_data][unit_amount]"), Some("250"));
        assert_eq!(get("line_items[0][price_data][product_data][name]"), Some("Soda"));
        assert_eq!(get("line_items[0][quantity]"), Some("2"));
    }

    #[tokio::test]
    async fn session_then_confirm_marks_order_paid() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let gateway = FakePaymentGateway::default();
        let settings = CheckoutSettings { currency: "usd".into(), success_url: "https://shop/ok".into(), cancel_url: "https://shop/no".into() };
        let u = seed_user(&db, "buyer@x.com").await?;
        let who = CurrentUser { id: u.id, email: u.email.clone(), role: UserRole::Customer };
        let cat = seed_category(&db, "Snacks").await?;
        let chips = seed_product(&db, cat.id, "Chips", 333, 10, 10).await?;
        let shipping = ShippingInfo {
            recipient_name: "Ann".into(),
            phone: "+380501234567".into(),
            city: "Kyiv".into(),
            warehouse: "1".into(),
            comment: None,
        };
        let o = order_service::create(
            &db,
            &RecordingMailer::default(),
            &who,
            CreateOrderInput { items: vec![OrderLineInput { product_id: chips.id, quantity: 3 }], shipping },
        )
        .await?;

        let session = create_session(&db, &gateway, &settings, &who, o.order.id).await?;
        let req = gateway.request(&session.session_id).unwrap();
        let total: i64 = req.lines.iter().map(|l| l.unit_amount * l.quantity as i64).sum();
        assert_eq!(total, o.order.total_cents);

        let pending = confirm(&db, &gateway, &who, &session.session_id).await?;
        assert!(!pending.paid);
        gateway.pay(&session.session_id);
        let done = confirm(&db, &gateway, &who, &session.session_id).await?;
        assert_eq!(done, ConfirmOutcome { order_id: o.order.id, paid: true });
        // confirming twice is harmless
        assert!(confirm(&db, &gateway, &who, &session.session_id).await?.paid);

        assert!(matches!(create_session(&db, &gateway, &settings, &who, o.order.id).await, Err(ServiceError::Validation(_))));
        assert!(matches!(confirm(&db, &gateway, &who, "cs_unknown").await, Err(ServiceError::Upstream(_))));
        assert!(matches!(confirm(&db, &gateway, &who, "../charges").await, Err(ServiceError::Validation(_))));
        Ok(())
    }

    #[test]
    fn session_ids_are_checked_before_use() {
        assert!(validate_session_id("cs_test_a1B2c3").is_ok());
        assert!(validate_session_id("cs_live_0").is_ok());
        let long = format!("cs_{}", "a".repeat(300));
        for bad in ["", "cs_", "pi_123", "cs_test/../../v1/charges", "cs_test?expand=x", "cs_a%2F", long.as_str()] {
            assert!(validate_session_id(bad).is_err(), "{bad}");
        }
    }
}
