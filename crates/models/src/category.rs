use sea_orm::{entity::prelude::*, ConnectionTrait, Set};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "category")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Parent }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Parent => Entity::belongs_to(Entity).from(Column::ParentId).to(Column::Id).into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub fn validate_name(name: &str) -> Result<(), ModelError> {
    if name.trim().is_empty() { return Err(ModelError::Validation("category name required".into())); }
    if name.chars().count() > 128 { return Err(ModelError::Validation("category name too long (<=128)".into())); }
    Ok(())
}

/// URL-safe identifier: lower-case ASCII alphanumerics joined by single `-`.
pub fn slugify(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_dash = false;
    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() { out.push('-'); }
            pending_dash = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    out
}

/// Use the explicit slug when given, otherwise derive one from the name.
pub fn resolve_slug(name: &str, slug: Option<&str>) -> Result<String, ModelError> {
    let s = match slug {
        Some(s) if !s.trim().is_empty() => slugify(s),
        _ => slugify(name),
    };
    if s.is_empty() {
        return Err(ModelError::Validation("slug must contain at least one ASCII letter or digit".into()));
    }
    Ok(s)
}

pub async fn create<C: ConnectionTrait>(
    db: &C,
    name: &str,
    slug: &str,
    description: Option<String>,
    parent_id: Option<Uuid>,
) -> Result<Model, ModelError> {
    validate_name(name)?;
    let now = Utc::now().into();
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.trim().to_string()),
        slug: Set(slug.to_string()),
        description: Set(description),
        parent_id: Set(parent_id),
        created_at: Set(now),
        updated_at: Set(now),
    };
    am.insert(db).await.map_err(|e| ModelError::on_insert(e, "category slug already exists"))
}

pub async fn find_by_slug<C: ConnectionTrait>(db: &C, slug: &str) -> Result<Option<Model>, ModelError> {
    Ok(Entity::find().filter(Column::Slug.eq(slug.to_string())).one(db).await?)
}
