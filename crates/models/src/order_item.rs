use sea_orm::{entity::prelude::*, Set};
use uuid::Uuid;
use serde::{Deserialize, Serialize};

use crate::{errors::ModelError, order, product};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "order_item")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub unit_price_cents: i64,
    pub discount_percent: i32,
    pub quantity: i32,
    pub line_total_cents: i64,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Order, Product }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Order => Entity::belongs_to(order::Entity).from(Column::OrderId).to(order::Column::Id).into(),
            Relation::Product => Entity::belongs_to(product::Entity).from(Column::ProductId).to(product::Column::Id).into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Price breakdown of a single order line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinePricing {
    pub gross_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
}

/// `discount = unit * qty * percent / 100`, rounded down over the whole line.
/// A line whose gross amount does not fit in `i64` is rejected.
pub fn price_line(unit_price_cents: i64, quantity: i32, discount_percent: i32) -> Result<LinePricing, ModelError> {
    let gross = unit_price_cents
        .checked_mul(quantity as i64)
        .ok_or_else(|| ModelError::Validation("order line amount is too large".into()))?;
    let total = product::discounted_price(gross, discount_percent);
    Ok(LinePricing { gross_cents: gross, discount_cents: gross - total, total_cents: total })
}

pub fn new_active(order_id: Uuid, product: &product::Model, quantity: i32, pricing: LinePricing) -> ActiveModel {
    ActiveModel {
        id: Set(Uuid::new_v4()),
        order_id: Set(order_id),
        product_id: Set(product.id),
        product_name: Set(product.name.clone()),
        unit_price_cents: Set(product.price_cents),
        discount_percent: Set(product.discount_percent),
        quantity: Set(quantity),
        line_total_cents: Set(pricing.total_cents),
    }
}
