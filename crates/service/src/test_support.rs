#![cfg(test)]
use migration::MigratorTrait;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use uuid::Uuid;

use models::{category, product, user};

/// Fresh in-memory SQLite database with every migration applied.
///
/// The pool holds a single connection: each SQLite memory connection is its
/// own database, so the schema must live on the one connection tests use.
pub async fn get_db() -> Result<DatabaseConnection, anyhow::Error> {
    let mut opt = ConnectOptions::new("sqlite::memory:".to_owned());
    opt.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(opt).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

pub async fn seed_user(db: &DatabaseConnection, email: &str) -> Result<user::Model, anyhow::Error> {
    Ok(user::create(db, email, "Test User", user::UserRole::Customer, true).await?)
}

pub async fn seed_category(db: &DatabaseConnection, name: &str) -> Result<category::Model, anyhow::Error> {
    let slug = category::resolve_slug(name, None)?;
    Ok(category::create(db, name, &slug, None, None).await?)
}

pub async fn seed_product(
    db: &DatabaseConnection,
    category_id: Uuid,
    name: &str,
    price_cents: i64,
    discount_percent: i32,
    stock: i32,
) -> Result<product::Model, anyhow::Error> {
    Ok(product::create(db, product::NewProduct {
        category_id,
        name: name.to_string(),
        slug: format!("{}-{}", category::slugify(name), &Uuid::new_v4().simple().to_string()[..8]),
        description: String::new(),
        price_cents,
        discount_percent,
        stock,
        is_active: true,
    })
    .await?)
}
