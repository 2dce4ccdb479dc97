use chrono::Utc;
use common::{pagination::Pagination, types::Page};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use models::support_request::{self, SupportStatus};
use crate::errors::ServiceError;
use crate::mail::{self, templates, Mailer};

#[derive(Debug, Clone, Deserialize)]
pub struct SupportInput {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

/// Store a request and forward it to the support inbox.
#[instrument(skip(db, mailer, input))]
pub async fn submit(
    db: &DatabaseConnection,
    mailer: &dyn Mailer,
    inbox: &str,
    user_id: Option<Uuid>,
    input: SupportInput,
) -> Result<support_request::Model, ServiceError> {
    let created = support_request::create(db, user_id, &input.name, &input.email, &input.subject, &input.message).await?;
    info!(request_id = %created.id, "support_request_submitted");
    mail::send_best_effort(mailer, templates::support_forward(inbox, &created)).await;
    Ok(created)
}

pub async fn list(db: &DatabaseConnection, status: Option<SupportStatus>, opts: Pagination) -> Result<Page<support_request::Model>, ServiceError> {
    let mut query = support_request::Entity::find().order_by_desc(support_request::Column::CreatedAt);
    if let Some(s) = status {
        query = query.filter(support_request::Column::Status.eq(s));
    }
    let (page_idx, per_page) = opts.normalize();
    let paginator = query.paginate(db, per_page);
    let total = paginator.num_items().await?;
    let items = paginator.fetch_page(page_idx).await?;
    let (page, per_page) = opts.effective();
    Ok(Page { items, total, page, per_page })
}

/// Resolving an already resolved request returns it unchanged.
pub async fn resolve(db: &DatabaseConnection, id: Uuid) -> Result<support_request::Model, ServiceError> {
    let found = support_request::Entity::find_by_id(id).one(db).await?.ok_or_else(|| ServiceError::not_found("support request"))?;
    if found.status == SupportStatus::Resolved {
        return Ok(found);
    }
    let mut am: support_request::ActiveModel = found.into();
    am.status = Set(SupportStatus::Resolved);
    am.resolved_at = Set(Some(Utc::now().into()));
    let updated = am.update(db).await?;
    info!(request_id = %id, "support_request_resolved");
    Ok(updated)
}
