use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter, QueryOrder};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use models::{errors::ModelError, product, wish_list_item};
use crate::errors::ServiceError;
use crate::product_service::ProductDto;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WishListEntry {
    pub added_at: DateTime<Utc>,
    pub product: ProductDto,
}

/// Wish list of a user, most recently added first.
pub async fn list(db: &DatabaseConnection, user_id: Uuid) -> Result<Vec<WishListEntry>, ServiceError> {
    let rows = wish_list_item::Entity::find()
        .filter(wish_list_item::Column::UserId.eq(user_id))
        .order_by_desc(wish_list_item::Column::CreatedAt)
        .find_also_related(product::Entity)
        .all(db)
        .await?;
    Ok(rows
        .into_iter()
        .filter_map(|(item, p)| p.map(|p| WishListEntry { added_at: item.created_at.with_timezone(&Utc), product: p.into() }))
        .collect())
}

/// Adding a product twice keeps a single entry.
pub async fn add(db: &DatabaseConnection, user_id: Uuid, product_id: Uuid) -> Result<(), ServiceError> {
    product::Entity::find_by_id(product_id).one(db).await?.ok_or_else(|| ServiceError::not_found("product"))?;
    if wish_list_item::find_pair(db, user_id, product_id).await?.is_some() {
        return Ok(());
    }
    match wish_list_item::create(db, user_id, product_id).await {
        // a concurrent add of the same pair already won
        Err(ModelError::Conflict(_)) => return Ok(()),
        res => res?,
    };
    info!(user_id = %user_id, product_id = %product_id, "wishlist_added");
    Ok(())
}

pub async fn remove(db: &DatabaseConnection, user_id: Uuid, product_id: Uuid) -> Result<(), ServiceError> {
    let item = wish_list_item::find_pair(db, user_id, product_id).await?.ok_or_else(|| ServiceError::not_found("wish list item"))?;
    item.delete(db).await?;
    Ok(())
}

/// Returns the number of removed entries.
pub async fn clear(db: &DatabaseConnection, user_id: Uuid) -> Result<u64, ServiceError> {
    let res = wish_list_item::Entity::delete_many()
        .filter(wish_list_item::Column::UserId.eq(user_id))
        .exec(db)
        .await?;
    Ok(res.rows_affected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{get_db, seed_category, seed_product, seed_user};

    #[tokio::test]
    async fn wishlist_service_flow() -> Result<(), anyhow::Error> {
        if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
        let db = get_db().await?;
        let u = seed_user(&db, "w@x.com").await?;
        let cat = seed_category(&db, "Books").await?;
        let a = seed_product(&db, cat.id, "Dune", 20_00, 50, 3).await?;
        let b = seed_product(&db, cat.id, "Emma", 10_00, 0, 3).await?;

        add(&db, u.id, a.id).await?;
        add(&db, u.id, a.id).await?;
        add(&db, u.id, b.id).await?;
        let entries = list(&db, u.id).await?;
        assert_eq!(entries.len(), 2);
        let dune = entries.iter().find(|e| e.product.id == a.id).unwrap();
        assert_eq!(dune.product.final_price_cents, 10_00);

        assert!(matches!(add(&db, u.id, Uuid::new_v4()).await, Err(ServiceError::NotFound(_))));
        remove(&db, u.id, a.id).await?;
        assert!(matches!(remove(&db, u.id, a.id).await, Err(ServiceError::NotFound(_))));
        assert_eq!(clear(&db, u.id).await?, 1);
        assert!(list(&db, u.id).await?.is_empty());
        Ok(())
    }
}
