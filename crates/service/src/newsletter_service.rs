use common::{pagination::Pagination, types::Page};
use sea_orm::{DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait, QueryOrder};
use serde::Serialize;
use tracing::{info, instrument};

use models::{errors::ModelError, news_subscription};
use crate::errors::ServiceError;
use crate::mail::{EmailMessage, Mailer};

/// Subscribing an address twice is not an error.
pub async fn subscribe(db: &DatabaseConnection, email: &str) -> Result<news_subscription::Model, ServiceError> {
    let email = models::user::validate_email(email)?;
    if let Some(existing) = news_subscription::find_by_email(db, &email).await? {
        return Ok(existing);
    }
    let created = match news_subscription::create(db, &email).await {
        Err(ModelError::Conflict(_)) => {
            return news_subscription::find_by_email(db, &email).await?.ok_or_else(|| ServiceError::not_found("subscription"));
        }
        res => res?,
    };
    info!(subscription_id = %created.id, "newsletter_subscribed");
    Ok(created)
}

/// Returns whether a subscription existed.
pub async fn unsubscribe(db: &DatabaseConnection, email: &str) -> Result<bool, ServiceError> {
    let email = email.trim().to_lowercase();
    match news_subscription::find_by_email(db, &email).await? {
        Some(s) => {
            s.delete(db).await?;
            Ok(true)
        }
        None => Ok(false),
    }
}

pub async fn list(db: &DatabaseConnection, opts: Pagination) -> Result<Page<news_subscription::Model>, ServiceError> {
    let (page_idx, per_page) = opts.normalize();
    let paginator = news_subscription::Entity::find()
        .order_by_asc(news_subscription::Column::CreatedAt)
        .paginate(db, per_page);
    let total = paginator.num_items().await?;
    let items = paginator.fetch_page(page_idx).await?;
    let (page, per_page) = opts.effective();
    Ok(Page { items, total, page, per_page })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BroadcastReport {
    pub sent: u64,
    pub failed: u64,
}

/// Send one message to every subscriber; individual failures are counted, not fatal.
#[instrument(skip(db, mailer, body))]
pub async fn broadcast(db: &DatabaseConnection, mailer: &dyn Mailer, subject: &str, body: &str) -> Result<BroadcastReport, ServiceError> {
    if subject.trim().is_empty() || body.trim().is_empty() {
        return Err(ServiceError::Validation("subject and body are required".into()));
    }
    let subscribers = news_subscription::Entity::find().all(db).await?;
    let mut report = BroadcastReport { sent: 0, failed: 0 };
    for s in subscribers {
        let msg = EmailMessage { to: s.email, subject: subject.trim().to_string(), html: body.to_string() };
        match mailer.send(msg).await {
            Ok(()) => report.sent += 1,
            Err(_) => report.failed += 1,
        }
    }
    info!(sent = report.sent, failed = report.failed, "newsletter_broadcast");
    Ok(report)
}
