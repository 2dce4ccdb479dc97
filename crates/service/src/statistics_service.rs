//! Sales statistics over non-cancelled orders. Item and revenue sums are
//! computed by the database through joins; the calendar bucketing by UTC
//! date happens over one small row per order.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Utc};
use sea_orm::{
    prelude::DateTimeWithTimeZone,
    sea_query::{Alias, Expr, IntoColumnRef, SimpleExpr},
    ColumnTrait, DatabaseConnection, EntityTrait, FromQueryResult, JoinType, PaginatorTrait, QueryFilter, QuerySelect,
    RelationTrait, Select,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use models::{order::{self, OrderStatus, PaymentStatus}, order_item, product, user};
use crate::errors::ServiceError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grouping {
    Day,
    #[default]
    Month,
    Year,
    AllTime,
}

/// Half-open `[from, to)` range on order creation time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl DateRange {
    fn validate(&self) -> Result<(), ServiceError> {
        if let (Some(f), Some(t)) = (self.from, self.to) {
            if f >= t {
                return Err(ServiceError::Validation("`from` must be earlier than `to`".into()));
            }
        }
        Ok(())
    }

    /// Restrict a query that selects from or joins `orders` to counted orders.
    fn apply<E: EntityTrait>(&self, mut q: Select<E>) -> Select<E> {
        q = q.filter(order::Column::Status.ne(OrderStatus::Cancelled));
        if let Some(f) = self.from {
            q = q.filter(order::Column::CreatedAt.gte(f));
        }
        if let Some(t) = self.to {
            q = q.filter(order::Column::CreatedAt.lt(t));
        }
        q
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Period {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub month: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SalesRow {
    pub period: Period,
    pub orders: u64,
    pub items_sold: i64,
    pub revenue_cents: i64,
}

/// One order as seen by the aggregation.
#[derive(Debug, Clone, Copy)]
pub struct Sale {
    pub created_at: DateTime<Utc>,
    pub items: i64,
    pub revenue_cents: i64,
}

fn period_of(grouping: Grouping, at: DateTime<Utc>) -> Period {
    match grouping {
        Grouping::Day => Period { year: Some(at.year()), month: Some(at.month()), day: Some(at.day()) },
        Grouping::Month => Period { year: Some(at.year()), month: Some(at.month()), day: None },
        Grouping::Year => Period { year: Some(at.year()), month: None, day: None },
        Grouping::AllTime => Period::default(),
    }
}

/// Group sales by period, newest period first (year, then month, then day,
/// all descending). `AllTime` always yields exactly one row.
pub fn aggregate_sales(grouping: Grouping, sales: &[Sale]) -> Vec<SalesRow> {
    let mut groups: BTreeMap<(i32, u32, u32), SalesRow> = BTreeMap::new();
    if grouping == Grouping::AllTime {
        groups.insert((0, 0, 0), SalesRow { period: Period::default(), orders: 0, items_sold: 0, revenue_cents: 0 });
    }
    for s in sales {
        let period = period_of(grouping, s.created_at);
        let key = (period.year.unwrap_or(0), period.month.unwrap_or(0), period.day.unwrap_or(0));
        let row = groups
            .entry(key)
            .or_insert(SalesRow { period, orders: 0, items_sold: 0, revenue_cents: 0 });
        row.orders += 1;
        row.items_sold += s.items;
        row.revenue_cents += s.revenue_cents;
    }
    groups.into_values().rev().collect()
}

/// `SUM` widened to BIGINT, so Postgres does not hand back NUMERIC.
fn sum_of<C: IntoColumnRef>(col: C) -> SimpleExpr {
    Expr::col(col).sum().cast_as(Alias::new("BIGINT"))
}

#[derive(Debug, FromQueryResult)]
struct OrderTotals {
    created_at: DateTimeWithTimeZone,
    total_cents: i64,
    items: Option<i64>,
}

#[instrument(skip(db))]
pub async fn sales(db: &DatabaseConnection, grouping: Grouping, range: DateRange) -> Result<Vec<SalesRow>, ServiceError> {
    range.validate()?;
    let rows = range
        .apply(order::Entity::find())
        .select_only()
        .column(order::Column::CreatedAt)
        .column(order::Column::TotalCents)
        .column_as(sum_of((order_item::Entity, order_item::Column::Quantity)), "items")
        .join(JoinType::LeftJoin, order_item::Relation::Order.def().rev())
        .group_by(order::Column::Id)
        .group_by(order::Column::CreatedAt)
        .group_by(order::Column::TotalCents)
        .into_model::<OrderTotals>()
        .all(db)
        .await?;
    let sales: Vec<Sale> = rows
        .into_iter()
        .map(|r| Sale {
            created_at: r.created_at.with_timezone(&Utc),
            items: r.items.unwrap_or(0),
            revenue_cents: r.total_cents,
        })
        .collect();
    Ok(aggregate_sales(grouping, &sales))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopProduct {
    pub product_id: Uuid,
    pub name: String,
    pub quantity: i64,
    pub revenue_cents: i64,
}

/// Rank by quantity desc, then revenue desc, then name asc.
pub fn rank_products(mut totals: Vec<TopProduct>, limit: usize) -> Vec<TopProduct> {
    totals.sort_by(|a, b| {
        b.quantity
            .cmp(&a.quantity)
            .then(b.revenue_cents.cmp(&a.revenue_cents))
            .then_with(|| a.name.cmp(&b.name))
    });
    totals.truncate(limit);
    totals
}

#[derive(Debug, FromQueryResult)]
struct ProductTotals {
    product_id: Uuid,
    name: Option<String>,
    quantity: Option<i64>,
    revenue_cents: Option<i64>,
}

/// Per-product totals are summed by the database, one row per product sold
/// in the range.
#[instrument(skip(db))]
pub async fn top_products(db: &DatabaseConnection, limit: u32, range: DateRange) -> Result<Vec<TopProduct>, ServiceError> {
    range.validate()?;
    let limit = limit.clamp(1, 100) as usize;
    let totals = range
        .apply(order_item::Entity::find().join(JoinType::InnerJoin, order_item::Relation::Order.def()))
        .select_only()
        .column(order_item::Column::ProductId)
        .column_as(Expr::col((order_item::Entity, order_item::Column::ProductName)).max(), "name")
        .column_as(sum_of((order_item::Entity, order_item::Column::Quantity)), "quantity")
        .column_as(sum_of((order_item::Entity, order_item::Column::LineTotalCents)), "revenue_cents")
        .group_by(order_item::Column::ProductId)
        .into_model::<ProductTotals>()
        .all(db)
        .await?
        .into_iter()
        .map(|t| TopProduct {
            product_id: t.product_id,
            name: t.name.unwrap_or_default(),
            quantity: t.quantity.unwrap_or(0),
            revenue_cents: t.revenue_cents.unwrap_or(0),
        })
        .collect();
    Ok(rank_products(totals, limit))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub users: u64,
    pub products: u64,
    pub orders: u64,
    pub paid_revenue_cents: i64,
}

pub async fn summary(db: &DatabaseConnection) -> Result<Summary, ServiceError> {
    let users = user::Entity::find().filter(user::Column::DeletedAt.is_null()).count(db).await?;
    let products = product::Entity::find().filter(product::Column::IsActive.eq(true)).count(db).await?;
    let orders = order::Entity::find().count(db).await?;
    let paid_revenue_cents = order::Entity::find()
        .filter(order::Column::PaymentStatus.eq(PaymentStatus::Paid))
        .select_only()
        .column_as(sum_of((order::Entity, order::Column::TotalCents)), "revenue")
        .into_tuple::<Option<i64>>()
        .one(db)
        .await?
        .flatten()
        .unwrap_or(0);
    Ok(Summary { users, products, orders, paid_revenue_cents })
}
