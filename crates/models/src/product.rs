use sea_orm::{entity::prelude::*, ConnectionTrait, Set};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{category, errors::ModelError};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "product")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub category_id: Uuid,
    pub name: String,
    pub slug: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub price_cents: i64,
    pub discount_percent: i32,
    pub stock: i32,
    pub is_active: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Category }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Category => Entity::belongs_to(category::Entity)
                .from(Column::CategoryId)
                .to(category::Column::Id)
                .into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn final_price_cents(&self) -> i64 {
        discounted_price(self.price_cents, self.discount_percent)
    }
}

/// Highest accepted unit price: 100 million in currency units.
pub const MAX_PRICE_CENTS: i64 = 10_000_000_000;

/// Unit price after a percentage discount; the discount amount is rounded down.
/// Split into whole hundreds and remainder so no intermediate product overflows.
pub fn discounted_price(price_cents: i64, discount_percent: i32) -> i64 {
    let d = discount_percent.clamp(0, 100) as i64;
    let off = price_cents / 100 * d + price_cents % 100 * d / 100;
    price_cents - off
}

pub fn validate_name(name: &str) -> Result<(), ModelError> {
    if name.trim().is_empty() { return Err(ModelError::Validation("product name required".into())); }
    if name.chars().count() > 200 { return Err(ModelError::Validation("product name too long (<=200)".into())); }
    Ok(())
}

pub fn validate_price(price_cents: i64) -> Result<(), ModelError> {
    if price_cents < 0 { return Err(ModelError::Validation("price_cents must be >= 0".into())); }
    if price_cents > MAX_PRICE_CENTS {
        return Err(ModelError::Validation(format!("price_cents must be <= {MAX_PRICE_CENTS}")));
    }
    Ok(())
}

pub fn validate_discount(discount_percent: i32) -> Result<(), ModelError> {
    if !(0..=100).contains(&discount_percent) {
        return Err(ModelError::Validation("discount_percent must be within 0..=100".into()));
    }
    Ok(())
}

pub fn validate_stock(stock: i32) -> Result<(), ModelError> {
    if stock < 0 { return Err(ModelError::Validation("stock must be >= 0".into())); }
    Ok(())
}

/// Fields required to insert a product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub category_id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub price_cents: i64,
    pub discount_percent: i32,
    pub stock: i32,
    pub is_active: bool,
}

pub async fn create<C: ConnectionTrait>(db: &C, input: NewProduct) -> Result<Model, ModelError> {
    validate_name(&input.name)?;
    validate_price(input.price_cents)?;
    validate_discount(input.discount_percent)?;
    validate_stock(input.stock)?;
    let now = Utc::now().into();
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        category_id: Set(input.category_id),
        name: Set(input.name.trim().to_string()),
        slug: Set(input.slug),
        description: Set(input.description),
        price_cents: Set(input.price_cents),
        discount_percent: Set(input.discount_percent),
        stock: Set(input.stock),
        is_active: Set(input.is_active),
        created_at: Set(now),
        updated_at: Set(now),
    };
    am.insert(db).await.map_err(|e| ModelError::on_insert(e, "product slug already exists"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discount_rounds_in_favour_of_the_shop() {
        assert_eq!(discounted_price(1000, 0), 1000);
        assert_eq!(discounted_price(1000, 15), 850);
        assert_eq!(discounted_price(999, 10), 900); // 99.9 -> 99 off
        assert_eq!(discounted_price(1000, 100), 0);
    }

    #[test]
    fn huge_prices_are_rejected_and_never_overflow() {
        assert!(validate_price(MAX_PRICE_CENTS).is_ok());
        assert!(validate_price(MAX_PRICE_CENTS + 1).is_err());
        assert!(validate_price(i64::MAX / 2).is_err());
        assert_eq!(discounted_price(i64::MAX / 2, 50), i64::MAX / 2 - i64::MAX / 4);
        assert_eq!(discounted_price(i64::MAX, 100), 0);
    }

    #[test]
    fn discount_bounds() {
        assert!(validate_discount(-1).is_err());
        assert!(validate_discount(101).is_err());
        assert!(validate_discount(100).is_ok());
    }
}
