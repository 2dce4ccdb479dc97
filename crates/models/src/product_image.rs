use sea_orm::{entity::prelude::*, ConnectionTrait, Set};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{errors::ModelError, product};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "product_image")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub product_id: Uuid,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub position: i32,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Product }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Product => Entity::belongs_to(product::Entity)
                .from(Column::ProductId)
                .to(product::Column::Id)
                .into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// File extension for the accepted image content types.
pub fn extension_for(content_type: &str) -> Option<&'static str> {
    match content_type.to_ascii_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}

pub async fn create<C: ConnectionTrait>(
    db: &C,
    product_id: Uuid,
    file_name: &str,
    content_type: &str,
    size_bytes: i64,
    position: i32,
) -> Result<Model, ModelError> {
    if extension_for(content_type).is_none() {
        return Err(ModelError::Validation(format!("unsupported image type: {content_type}")));
    }
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        product_id: Set(product_id),
        file_name: Set(file_name.to_string()),
        content_type: Set(content_type.to_ascii_lowercase()),
        size_bytes: Set(size_bytes),
        position: Set(position),
        created_at: Set(Utc::now().into()),
    };
    Ok(am.insert(db).await?)
}

pub async fn list_for_product<C: ConnectionTrait>(db: &C, product_id: Uuid) -> Result<Vec<Model>, ModelError> {
    use sea_orm::QueryOrder;
    Ok(Entity::find()
        .filter(Column::ProductId.eq(product_id))
        .order_by_asc(Column::Position)
        .order_by_asc(Column::CreatedAt)
        .all(db)
        .await?)
}
