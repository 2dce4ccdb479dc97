use sea_orm::{entity::prelude::*, Set};
use uuid::Uuid;
use serde::{Deserialize, Serialize};

use crate::user;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "processing")]
    Processing,
    #[sea_orm(string_value = "shipped")]
    Shipped,
    #[sea_orm(string_value = "delivered")]
    Delivered,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl OrderStatus {
    /// Forward-only lifecycle; cancellation is allowed until the parcel ships.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Processing, Shipped)
                | (Shipped, Delivered)
                | (Pending, Cancelled)
                | (Processing, Cancelled)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[sea_orm(string_value = "unpaid")]
    Unpaid,
    #[sea_orm(string_value = "paid")]
    Paid,
    #[sea_orm(string_value = "refunded")]
    Refunded,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub recipient_name: String,
    pub phone: String,
    pub city: String,
    pub warehouse: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub comment: Option<String>,
    pub stripe_session_id: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { User }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::User => Entity::belongs_to(user::Entity).from(Column::UserId).to(user::Column::Id).into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Shipping destination captured with the order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingInfo {
    pub recipient_name: String,
    pub phone: String,
    pub city: String,
    pub warehouse: String,
    #[serde(default)]
    pub comment: Option<String>,
}

impl ShippingInfo {
    pub fn validate(&self) -> Result<(), crate::errors::ModelError> {
        use crate::errors::ModelError;
        if self.recipient_name.trim().is_empty() { return Err(ModelError::Validation("recipient_name required".into())); }
        if self.city.trim().is_empty() { return Err(ModelError::Validation("city required".into())); }
        if self.warehouse.trim().is_empty() { return Err(ModelError::Validation("warehouse required".into())); }
        user::validate_phone(&self.phone)
    }
}

/// Order header for insertion; totals are computed by the caller.
pub fn new_active(
    user_id: Uuid,
    subtotal_cents: i64,
    discount_cents: i64,
    shipping: ShippingInfo,
) -> ActiveModel {
    let now: DateTimeWithTimeZone = chrono::Utc::now().into();
    ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        status: Set(OrderStatus::Pending),
        payment_status: Set(PaymentStatus::Unpaid),
        subtotal_cents: Set(subtotal_cents),
        discount_cents: Set(discount_cents),
        total_cents: Set(subtotal_cents - discount_cents),
        recipient_name: Set(shipping.recipient_name.trim().to_string()),
        phone: Set(shipping.phone.trim().to_string()),
        city: Set(shipping.city.trim().to_string()),
        warehouse: Set(shipping.warehouse.trim().to_string()),
        comment: Set(shipping.comment.filter(|c| !c.trim().is_empty())),
        stripe_session_id: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
}

#[cfg(test)]
mod tests {
    use super::OrderStatus::{self, *};

    #[test]
    fn lifecycle_moves_forward_only() {
        assert!(Pending.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Shipped));
        assert!(Shipped.can_transition_to(Delivered));
        assert!(!Shipped.can_transition_to(Processing));
        assert!(!Pending.can_transition_to(Delivered));
    }

    #[test]
    fn cancellation_window() {
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Processing.can_transition_to(Cancelled));
        assert!(!Shipped.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Pending));
    }

    #[test]
    fn terminal_states_have_no_exit() {
        use sea_orm::Iterable;
        for next in OrderStatus::iter() {
            assert!(!Delivered.can_transition_to(next));
            assert!(!Cancelled.can_transition_to(next));
        }
    }
}
