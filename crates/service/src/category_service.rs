use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use models::{category, product};
use crate::errors::ServiceError;

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryInput {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
}

/// Partial update; `parent_id: null` detaches the category from its parent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryUpdate {
    pub name: Option<String>,
    pub slug: Option<String>,
    #[serde(default, deserialize_with = "crate::double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "crate::double_option")]
    pub parent_id: Option<Option<Uuid>>,
}

/// All categories ordered by name.
pub async fn list(db: &DatabaseConnection) -> Result<Vec<category::Model>, ServiceError> {
    Ok(category::Entity::find().order_by_asc(category::Column::Name).all(db).await?)
}

pub async fn get(db: &DatabaseConnection, id: Uuid) -> Result<category::Model, ServiceError> {
    category::Entity::find_by_id(id).one(db).await?.ok_or_else(|| ServiceError::not_found("category"))
}

async fn ensure_slug_free(db: &DatabaseConnection, slug: &str, except: Option<Uuid>) -> Result<(), ServiceError> {
    if let Some(existing) = category::find_by_slug(db, slug).await? {
        if Some(existing.id) != except {
            return Err(ServiceError::Conflict(format!("category slug '{}' already exists", slug)));
        }
    }
    Ok(())
}

/// Reject a parent that does not exist or that would make `id` its own ancestor.
async fn check_parent(db: &DatabaseConnection, id: Option<Uuid>, parent_id: Uuid) -> Result<(), ServiceError> {
    if Some(parent_id) == id {
        return Err(ServiceError::Validation("category cannot be its own parent".into()));
    }
    let mut cursor = Some(get(db, parent_id).await.map_err(|_| ServiceError::Validation("parent category not found".into()))?);
    while let Some(c) = cursor {
        if Some(c.id) == id {
            return Err(ServiceError::Validation("category parent would create a cycle".into()));
        }
        cursor = match c.parent_id {
            Some(p) => category::Entity::find_by_id(p).one(db).await?,
            None => None,
        };
    }
    Ok(())
}

pub async fn create(db: &DatabaseConnection, input: CategoryInput) -> Result<category::Model, ServiceError> {
    category::validate_name(&input.name)?;
    let slug = category::resolve_slug(&input.name, input.slug.as_deref())?;
    ensure_slug_free(db, &slug, None).await?;
    if let Some(parent) = input.parent_id {
        check_parent(db, None, parent).await?;
    }
    let created = category::create(db, &input.name, &slug, input.description, input.parent_id).await?;
    info!(category_id = %created.id, slug = %created.slug, "category_created");
    Ok(created)
}

pub async fn update(db: &DatabaseConnection, id: Uuid, input: CategoryUpdate) -> Result<category::Model, ServiceError> {
    let found = get(db, id).await?;
    let mut am: category::ActiveModel = found.clone().into();
    if let Some(name) = &input.name {
        category::validate_name(name)?;
        am.name = Set(name.trim().to_string());
    }
    if let Some(slug) = &input.slug {
        let name = input.name.as_deref().unwrap_or(&found.name);
        let slug = category::resolve_slug(name, Some(slug))?;
        ensure_slug_free(db, &slug, Some(id)).await?;
        am.slug = Set(slug);
    }
    if let Some(description) = input.description {
        am.description = Set(description);
    }
    if let Some(parent) = input.parent_id {
        if let Some(p) = parent {
            check_parent(db, Some(id), p).await?;
        }
        am.parent_id = Set(parent);
    }
    am.updated_at = Set(Utc::now().into());
    Ok(am.update(db).await?)
}

/// Delete a category that no product or sub-category references.
pub async fn delete(db: &DatabaseConnection, id: Uuid) -> Result<(), ServiceError> {
    get(db, id).await?;
    let products = product::Entity::find().filter(product::Column::CategoryId.eq(id)).count(db).await?;
    if products > 0 {
        return Err(ServiceError::Conflict(format!("category has {} product(s)", products)));
    }
    let children = category::Entity::find().filter(category::Column::ParentId.eq(id)).count(db).await?;
    if children > 0 {
        return Err(ServiceError::Conflict(format!("category has {} sub-categories", children)));
    }
    category::Entity::delete_by_id(id).exec(db).await?;
    info!(category_id = %id, "category_deleted");
    Ok(())
}
