//! Outgoing email: the `Mailer` seam, its log and HTTP implementations, and
//! the message templates used by the account, order and support flows.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};

use crate::errors::ServiceError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, msg: EmailMessage) -> Result<(), ServiceError>;
}

/// Writes messages to the log instead of delivering them.
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, msg: EmailMessage) -> Result<(), ServiceError> {
        info!(to = %msg.to, subject = %msg.subject, bytes = msg.html.len(), "email_logged");
        Ok(())
    }
}

/// Delivers mail through an HTTP relay accepting `{from, to, subject, html}`.
pub struct HttpMailer {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    from: String,
}

#[derive(Serialize)]
struct OutgoingMail<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
}

impl HttpMailer {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>, from: impl Into<String>) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        Ok(Self { client, endpoint: endpoint.into(), api_key: api_key.into(), from: from.into() })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, msg: EmailMessage) -> Result<(), ServiceError> {
        let body = OutgoingMail { from: &self.from, to: &msg.to, subject: &msg.subject, html: &msg.html };
        let resp = self.client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ServiceError::Upstream(format!("mail relay: {e}")))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            warn!(%status, to = %msg.to, "mail relay rejected message");
            return Err(ServiceError::Upstream(format!("mail relay returned {status}: {text}")));
        }
        info!(to = %msg.to, subject = %msg.subject, "email_sent");
        Ok(())
    }
}

/// Build the mailer selected by `mail.provider`.
pub fn from_config(cfg: &configs::MailConfig) -> Result<std::sync::Arc<dyn Mailer>, ServiceError> {
    match cfg.provider.as_str() {
        "http" => {
            if cfg.endpoint.trim().is_empty() {
                return Err(ServiceError::Validation("mail.endpoint required for http provider".into()));
            }
            Ok(std::sync::Arc::new(HttpMailer::new(cfg.endpoint.clone(), cfg.api_key.clone(), cfg.from.clone())?))
        }
        _ => Ok(std::sync::Arc::new(LogMailer)),
    }
}

/// Send and swallow the error; used where mail is a side effect of a committed operation.
pub async fn send_best_effort(mailer: &dyn Mailer, msg: EmailMessage) {
    let to = msg.to.clone();
    if let Err(e) = mailer.send(msg).await {
        warn!(error = %e, %to, "email delivery failed");
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;")
}

pub mod templates {
    use super::{escape, EmailMessage};

    pub fn confirm_email(to: &str, name: &str, link: &str) -> EmailMessage {
        EmailMessage {
            to: to.to_string(),
            subject: "Confirm your email".into(),
            html: format!(
                "<p>Hello {},</p><p>Please confirm your email address: <a href=\"{}\">{}</a></p><p>The link is valid for 24 hours.</p>",
                escape(name), escape(link), escape(link)
            ),
        }
    }

    pub fn password_reset(to: &str, name: &str, link: &str) -> EmailMessage {
        EmailMessage {
            to: to.to_string(),
            subject: "Password reset".into(),
            html: format!(
                "<p>Hello {},</p><p>Reset your password here: <a href=\"{}\">{}</a></p><p>The link is valid for 1 hour. Ignore this message if you did not ask for it.</p>",
                escape(name), escape(link), escape(link)
            ),
        }
    }

    pub fn order_confirmation(to: &str, order: &models::order::Model, items: &[models::order_item::Model]) -> EmailMessage {
        let rows: String = items
            .iter()
            .map(|i| format!("<li>{} x {}: {}</li>", escape(&i.product_name), i.quantity, crate::format_cents(i.line_total_cents)))
            .collect();
        EmailMessage {
            to: to.to_string(),
            subject: format!("Order {} received", order.id),
            html: format!(
                "<p>Thank you for your order.</p><ul>{}</ul><p>Total: {}</p><p>Delivery: {}, {}</p>",
                rows,
                crate::format_cents(order.total_cents),
                escape(&order.city),
                escape(&order.warehouse)
            ),
        }
    }

    pub fn support_forward(inbox: &str, req: &models::support_request::Model) -> EmailMessage {
        EmailMessage {
            to: inbox.to_string(),
            subject: format!("[support] {}", req.subject),
            html: format!(
                "<p>From: {} &lt;{}&gt;</p><p>{}</p><p>Request id: {}</p>",
                escape(&req.name), escape(&req.email), escape(&req.message).replace('\n', "<br>"), req.id
            ),
        }
    }
}

/// In-memory mailer that records every message; used by tests.
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct RecordingMailer {
        sent: Mutex<Vec<EmailMessage>>,
        /// Recipients for which delivery fails.
        failing: Mutex<Vec<String>>,
    }

    impl RecordingMailer {
        pub fn sent(&self) -> Vec<EmailMessage> {
            self.sent.lock().map(|v| v.clone()).unwrap_or_default()
        }

        pub fn fail_for(&self, to: &str) {
            if let Ok(mut f) = self.failing.lock() { f.push(to.to_string()); }
        }
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, msg: EmailMessage) -> Result<(), ServiceError> {
            let fails = self.failing.lock().map(|f| f.contains(&msg.to)).unwrap_or(false);
            if fails {
                return Err(ServiceError::Upstream(format!("delivery to {} failed", msg.to)));
            }
            self.sent.lock().map_err(|e| ServiceError::Internal(e.to_string()))?.push(msg);
            Ok(())
        }
    }
}
