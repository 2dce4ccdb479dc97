//! Orders: pricing, atomic stock reservation and the status lifecycle.

use std::collections::HashMap;

use chrono::Utc;
use common::{pagination::Pagination, types::Page};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use models::{
    order::{self, OrderStatus, PaymentStatus, ShippingInfo},
    order_item, product,
};
use crate::auth::domain::CurrentUser;
use crate::errors::ServiceError;
use crate::mail::{self, templates, Mailer};

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub struct OrderLineInput {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderInput {
    pub items: Vec<OrderLineInput>,
    pub shipping: ShippingInfo,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OrderDto {
    #[serde(flatten)]
    pub order: order::Model,
    pub items: Vec<order_item::Model>,
}

/// Validate quantities and merge lines naming the same product, keeping first-seen order.
pub fn merge_lines(items: &[OrderLineInput]) -> Result<Vec<OrderLineInput>, ServiceError> {
    if items.is_empty() {
        return Err(ServiceError::Validation("order must contain at least one item".into()));
    }
    let mut merged: Vec<OrderLineInput> = Vec::with_capacity(items.len());
    for line in items {
        if line.quantity < 1 {
            return Err(ServiceError::Validation("quantity must be >= 1".into()));
        }
        match merged.iter_mut().find(|m| m.product_id == line.product_id) {
            Some(m) => {
                m.quantity = m.quantity
                    .checked_add(line.quantity)
                    .ok_or_else(|| ServiceError::Validation("quantity too large".into()))?;
            }
            None => merged.push(*line),
        }
    }
    Ok(merged)
}

async fn items_for<C: ConnectionTrait>(db: &C, order_ids: Vec<Uuid>) -> Result<HashMap<Uuid, Vec<order_item::Model>>, ServiceError> {
    let mut grouped: HashMap<Uuid, Vec<order_item::Model>> = HashMap::new();
    if order_ids.is_empty() {
        return Ok(grouped);
    }
    let rows = order_item::Entity::find()
        .filter(order_item::Column::OrderId.is_in(order_ids))
        .order_by_asc(order_item::Column::ProductName)
        .all(db)
        .await?;
    for row in rows {
        grouped.entry(row.order_id).or_default().push(row);
    }
    Ok(grouped)
}

async fn with_items<C: ConnectionTrait>(db: &C, orders: Vec<order::Model>) -> Result<Vec<OrderDto>, ServiceError> {
    let mut items = items_for(db, orders.iter().map(|o| o.id).collect()).await?;
    Ok(orders
        .into_iter()
        .map(|o| OrderDto { items: items.remove(&o.id).unwrap_or_default(), order: o })
        .collect())
}

async fn load<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<order::Model, ServiceError> {
    order::Entity::find_by_id(id).one(db).await?.ok_or_else(|| ServiceError::not_found("order"))
}

/// Put the quantities of every line back on the shelf; deleted products are skipped.
async fn restore_stock<C: ConnectionTrait>(db: &C, order_id: Uuid) -> Result<(), ServiceError> {
    let lines = order_item::Entity::find().filter(order_item::Column::OrderId.eq(order_id)).all(db).await?;
    for line in lines {
        product::Entity::update_many()
            .col_expr(product::Column::Stock, Expr::col(product::Column::Stock).add(line.quantity))
            .filter(product::Column::Id.eq(line.product_id))
            .exec(db)
            .await?;
    }
    Ok(())
}

fn total_too_large() -> ServiceError {
    ServiceError::Validation("order total is too large".into())
}

/// Place an order: every line reserves stock inside one transaction, so a
/// single short line leaves nothing behind.
#[instrument(skip(db, mailer, input), fields(user_id = %customer.id))]
pub async fn create(
    db: &DatabaseConnection,
    mailer: &dyn Mailer,
    customer: &CurrentUser,
    input: CreateOrderInput,
) -> Result<OrderDto, ServiceError> {
    input.shipping.validate()?;
    let lines = merge_lines(&input.items)?;

    let txn = db.begin().await?;
    let mut priced = Vec::with_capacity(lines.len());
    let (mut subtotal, mut discount) = (0i64, 0i64);
    for line in &lines {
        let p = product::Entity::find_by_id(line.product_id)
            .one(&txn)
            .await?
            .filter(|p| p.is_active)
            .ok_or_else(|| ServiceError::Validation(format!("product {} is not available", line.product_id)))?;
        let res = product::Entity::update_many()
            .col_expr(product::Column::Stock, Expr::col(product::Column::Stock).sub(line.quantity))
            .filter(product::Column::Id.eq(p.id))
            .filter(product::Column::Stock.gte(line.quantity))
            .exec(&txn)
            .await?;
        if res.rows_affected == 0 {
            return Err(ServiceError::Conflict(format!("insufficient stock for '{}'", p.name)));
        }
        let pricing = order_item::price_line(p.price_cents, line.quantity, p.discount_percent)?;
        subtotal = subtotal.checked_add(pricing.gross_cents).ok_or_else(total_too_large)?;
        discount = discount.checked_add(pricing.discount_cents).ok_or_else(total_too_large)?;
        priced.push((p, line.quantity, pricing));
    }

    let header = order::new_active(customer.id, subtotal, discount, input.shipping).insert(&txn).await?;
    let mut items = Vec::with_capacity(priced.len());
    for (p, qty, pricing) in &priced {
        items.push(order_item::new_active(header.id, p, *qty, *pricing).insert(&txn).await?);
    }
    txn.commit().await?;
    info!(order_id = %header.id, total_cents = header.total_cents, lines = items.len(), "order_created");

    mail::send_best_effort(mailer, templates::order_confirmation(&customer.email, &header, &items)).await;
    Ok(OrderDto { order: header, items })
}

/// Visible to its owner and to admins; anyone else sees NotFound.
pub async fn get(db: &DatabaseConnection, viewer: &CurrentUser, id: Uuid) -> Result<OrderDto, ServiceError> {
    let o = load(db, id).await?;
    if o.user_id != viewer.id && !viewer.is_admin() {
        return Err(ServiceError::not_found("order"));
    }
    let mut dtos = with_items(db, vec![o]).await?;
    dtos.pop().ok_or_else(|| ServiceError::not_found("order"))
}

pub async fn list_mine(db: &DatabaseConnection, user_id: Uuid, opts: Pagination) -> Result<Page<OrderDto>, ServiceError> {
    let query = order::Entity::find()
        .filter(order::Column::UserId.eq(user_id))
        .order_by_desc(order::Column::CreatedAt);
    page_of(db, query, opts).await
}

pub async fn list_all(db: &DatabaseConnection, status: Option<OrderStatus>, opts: Pagination) -> Result<Page<OrderDto>, ServiceError> {
    let mut query = order::Entity::find().order_by_desc(order::Column::CreatedAt);
    if let Some(s) = status {
        query = query.filter(order::Column::Status.eq(s));
    }
    page_of(db, query, opts).await
}

async fn page_of(db: &DatabaseConnection, query: sea_orm::Select<order::Entity>, opts: Pagination) -> Result<Page<OrderDto>, ServiceError> {
    let (page_idx, per_page) = opts.normalize();
    let paginator = query.paginate(db, per_page);
    let total = paginator.num_items().await?;
    let orders = paginator.fetch_page(page_idx).await?;
    let (page, per_page) = opts.effective();
    Ok(Page { items: with_items(db, orders).await?, total, page, per_page })
}

/// Admin status change. Same status is a no-op; cancelling restores stock.
#[instrument(skip(db))]
pub async fn update_status(db: &DatabaseConnection, id: Uuid, next: OrderStatus) -> Result<OrderDto, ServiceError> {
    let txn = db.begin().await?;
    let current = load(&txn, id).await?;
    if current.status == next {
        txn.commit().await?;
        return get_unchecked(db, id).await;
    }
    if !current.status.can_transition_to(next) {
        return Err(ServiceError::Validation(format!(
            "cannot change order status from {} to {}",
            current.status.as_str(),
            next.as_str()
        )));
    }
    let from = current.status;
    set_status(&txn, current, next).await?;
    if next == OrderStatus::Cancelled {
        restore_stock(&txn, id).await?;
    }
    txn.commit().await?;
    info!(order_id = %id, from = from.as_str(), to = next.as_str(), "order_status_changed");
    get_unchecked(db, id).await
}

/// Customer cancellation, allowed only while the order is still pending.
#[instrument(skip(db))]
pub async fn cancel(db: &DatabaseConnection, user_id: Uuid, id: Uuid) -> Result<OrderDto, ServiceError> {
    let txn = db.begin().await?;
    let current = load(&txn, id).await?;
    if current.user_id != user_id {
        return Err(ServiceError::not_found("order"));
    }
    if current.status != OrderStatus::Pending {
        return Err(ServiceError::Validation(format!("order is {} and can no longer be cancelled", current.status.as_str())));
    }
    set_status(&txn, current, OrderStatus::Cancelled).await?;
    restore_stock(&txn, id).await?;
    txn.commit().await?;
    info!(order_id = %id, "order_cancelled");
    get_unchecked(db, id).await
}

async fn set_status<C: ConnectionTrait>(db: &C, o: order::Model, status: OrderStatus) -> Result<order::Model, ServiceError> {
    let mut am: order::ActiveModel = o.into();
    am.status = Set(status);
    am.updated_at = Set(Utc::now().into());
    Ok(am.update(db).await?)
}

async fn get_unchecked(db: &DatabaseConnection, id: Uuid) -> Result<OrderDto, ServiceError> {
    let o = load(db, id).await?;
    let mut dtos = with_items(db, vec![o]).await?;
    dtos.pop().ok_or_else(|| ServiceError::not_found("order"))
}

/// Record a successful payment. Repeated calls leave the order unchanged.
pub async fn mark_paid(db: &DatabaseConnection, id: Uuid) -> Result<order::Model, ServiceError> {
    let o = load(db, id).await?;
    if o.payment_status == PaymentStatus::Paid {
        return Ok(o);
    }
    let mut am: order::ActiveModel = o.into();
    am.payment_status = Set(PaymentStatus::Paid);
    am.updated_at = Set(Utc::now().into());
    let updated = am.update(db).await?;
    info!(order_id = %id, "order_paid");
    Ok(updated)
}

pub(crate) async fn attach_checkout_session(db: &DatabaseConnection, o: order::Model, session_id: &str) -> Result<order::Model, ServiceError> {
    let mut am: order::ActiveModel = o.into();
    am.stripe_session_id = Set(Some(session_id.to_string()));
    am.updated_at = Set(Utc::now().into());
    Ok(am.update(db).await?)
}
