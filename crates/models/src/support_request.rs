use sea_orm::{entity::prelude::*, ConnectionTrait, Set};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{errors::ModelError, user};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum SupportStatus {
    #[sea_orm(string_value = "open")]
    Open,
    #[sea_orm(string_value = "resolved")]
    Resolved,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "support_request")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub name: String,
    pub email: String,
    pub subject: String,
    #[sea_orm(column_type = "Text")]
    pub message: String,
    pub status: SupportStatus,
    pub created_at: DateTimeWithTimeZone,
    pub resolved_at: Option<DateTimeWithTimeZone>,
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

pub async fn create<C: ConnectionTrait>(
    db: &C,
    user_id: Option<Uuid>,
    name: &str,
    email: &str,
    subject: &str,
    message: &str,
) -> Result<Model, ModelError> {
    let email = user::validate_email(email)?;
    user::validate_name(name)?;
    if subject.trim().is_empty() || subject.chars().count() > 200 {
        return Err(ModelError::Validation("subject must be 1..=200 characters".into()));
    }
    if message.trim().is_empty() || message.chars().count() > 5000 {
        return Err(ModelError::Validation("message must be 1..=5000 characters".into()));
    }
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        name: Set(name.trim().to_string()),
        email: Set(email),
        subject: Set(subject.trim().to_string()),
        message: Set(message.trim().to_string()),
        status: Set(SupportStatus::Open),
        created_at: Set(Utc::now().into()),
        resolved_at: Set(None),
    };
    Ok(am.insert(db).await?)
}
