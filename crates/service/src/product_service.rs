//! Catalog products: filtered listing, CRUD and the public DTO.

use chrono::{DateTime, Utc};
use common::{pagination::Pagination, types::Page};
use sea_orm::{
    sea_query::{Expr, Func, LikeExpr},
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use models::{category, order_item, product, product_image};
use crate::errors::ServiceError;
use crate::image_service::{ImageDto, ImageStore};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProductDto {
    pub id: Uuid,
    pub category_id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub price_cents: i64,
    pub discount_percent: i32,
    /// Unit price after discount.
    pub final_price_cents: i64,
    pub stock: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<ImageDto>>,
}

impl From<product::Model> for ProductDto {
    fn from(p: product::Model) -> Self {
        Self {
            final_price_cents: p.final_price_cents(),
            id: p.id,
            category_id: p.category_id,
            name: p.name,
            slug: p.slug,
            description: p.description,
            price_cents: p.price_cents,
            discount_percent: p.discount_percent,
            stock: p.stock,
            is_active: p.is_active,
            created_at: p.created_at.with_timezone(&Utc),
            updated_at: p.updated_at.with_timezone(&Utc),
            images: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    Name,
}

/// Listing filter; price bounds apply to the undiscounted `price_cents`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductFilter {
    pub category_id: Option<Uuid>,
    pub search: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    #[serde(default)]
    pub in_stock: bool,
    /// Honoured for admins only; the web layer clears it for everyone else.
    #[serde(default)]
    pub include_inactive: bool,
    #[serde(default)]
    pub sort: ProductSort,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductInput {
    pub category_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
    pub price_cents: i64,
    #[serde(default)]
    pub discount_percent: i32,
    #[serde(default)]
    pub stock: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool { true }

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductUpdate {
    pub category_id: Option<Uuid>,
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub price_cents: Option<i64>,
    pub discount_percent: Option<i32>,
    pub stock: Option<i32>,
    pub is_active: Option<bool>,
}

/// What `delete` did with the product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteOutcome {
    Deleted,
    /// Kept because orders reference it; hidden from the catalog instead.
    Deactivated,
}

/// Case-insensitive substring pattern; `%`, `_` and `\` in the search text
/// match themselves.
fn contains_literally(text: &str) -> LikeExpr {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for c in text.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    LikeExpr::new(pattern).escape('\\')
}

fn filter_condition(filter: &ProductFilter) -> Result<Condition, ServiceError> {
    if let (Some(min), Some(max)) = (filter.min_price, filter.max_price) {
        if min > max {
            return Err(ServiceError::Validation("min_price must not exceed max_price".into()));
        }
    }
    let mut cond = Condition::all();
    if !filter.include_inactive {
        cond = cond.add(product::Column::IsActive.eq(true));
    }
    if let Some(c) = filter.category_id {
        cond = cond.add(product::Column::CategoryId.eq(c));
    }
    if let Some(q) = filter.search.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        cond = cond.add(Expr::expr(Func::lower(Expr::col((product::Entity, product::Column::Name)))).like(contains_literally(q)));
    }
    if let Some(min) = filter.min_price {
        cond = cond.add(product::Column::PriceCents.gte(min));
    }
    if let Some(max) = filter.max_price {
        cond = cond.add(product::Column::PriceCents.lte(max));
    }
    if filter.in_stock {
        cond = cond.add(product::Column::Stock.gt(0));
    }
    Ok(cond)
}

#[instrument(skip(db))]
pub async fn list(db: &DatabaseConnection, filter: &ProductFilter, opts: Pagination) -> Result<Page<ProductDto>, ServiceError> {
    let mut query = product::Entity::find().filter(filter_condition(filter)?);
    query = match filter.sort {
        ProductSort::Newest => query.order_by_desc(product::Column::CreatedAt),
        ProductSort::PriceAsc => query.order_by_asc(product::Column::PriceCents),
        ProductSort::PriceDesc => query.order_by_desc(product::Column::PriceCents),
        ProductSort::Name => query.order_by_asc(product::Column::Name),
    };
    // stable order across pages
    query = query.order_by_asc(product::Column::Id);

    let (page_idx, per_page) = opts.normalize();
    let paginator = query.paginate(db, per_page);
    let total = paginator.num_items().await?;
    let items = paginator.fetch_page(page_idx).await?;
    let (page, per_page) = opts.effective();
    Ok(Page { items: items.into_iter().map(ProductDto::from).collect(), total, page, per_page })
}

/// Product with its images. Inactive products are only visible to admins.
pub async fn get(db: &DatabaseConnection, store: &ImageStore, id: Uuid, include_inactive: bool) -> Result<ProductDto, ServiceError> {
    let p = product::Entity::find_by_id(id)
        .one(db)
        .await?
        .filter(|p| p.is_active || include_inactive)
        .ok_or_else(|| ServiceError::not_found("product"))?;
    let images = product_image::list_for_product(db, p.id).await?;
    let mut dto = ProductDto::from(p);
    dto.images = Some(images.into_iter().map(|m| ImageDto::from_model(m, store)).collect());
    Ok(dto)
}

async fn ensure_category(db: &DatabaseConnection, id: Uuid) -> Result<(), ServiceError> {
    category::Entity::find_by_id(id)
        .one(db)
        .await?
        .map(|_| ())
        .ok_or_else(|| ServiceError::Validation("category does not exist".into()))
}

async fn ensure_slug_free(db: &DatabaseConnection, slug: &str, except: Option<Uuid>) -> Result<(), ServiceError> {
    let existing = product::Entity::find().filter(product::Column::Slug.eq(slug)).one(db).await?;
    match existing {
        Some(p) if Some(p.id) != except => Err(ServiceError::Conflict(format!("product slug '{}' already exists", slug))),
        _ => Ok(()),
    }
}

pub async fn create(db: &DatabaseConnection, input: ProductInput) -> Result<ProductDto, ServiceError> {
    product::validate_name(&input.name)?;
    ensure_category(db, input.category_id).await?;
    let slug = category::resolve_slug(&input.name, input.slug.as_deref())?;
    ensure_slug_free(db, &slug, None).await?;
    let created = product::create(db, product::NewProduct {
        category_id: input.category_id,
        name: input.name,
        slug,
        description: input.description,
        price_cents: input.price_cents,
        discount_percent: input.discount_percent,
        stock: input.stock,
        is_active: input.is_active,
    })
    .await?;
    info!(product_id = %created.id, slug = %created.slug, "product_created");
    Ok(created.into())
}

pub async fn update(db: &DatabaseConnection, id: Uuid, input: ProductUpdate) -> Result<ProductDto, ServiceError> {
    let found = product::Entity::find_by_id(id).one(db).await?.ok_or_else(|| ServiceError::not_found("product"))?;
    let mut am: product::ActiveModel = found.clone().into();
    if let Some(c) = input.category_id {
        ensure_category(db, c).await?;
        am.category_id = Set(c);
    }
    if let Some(name) = &input.name {
        product::validate_name(name)?;
        am.name = Set(name.trim().to_string());
    }
    if let Some(slug) = &input.slug {
        let slug = category::resolve_slug(input.name.as_deref().unwrap_or(&found.name), Some(slug))?;
        ensure_slug_free(db, &slug, Some(id)).await?;
        am.slug = Set(slug);
    }
    if let Some(d) = input.description {
        am.description = Set(d);
    }
    if let Some(p) = input.price_cents {
        product::validate_price(p)?;
        am.price_cents = Set(p);
    }
    if let Some(d) = input.discount_percent {
        product::validate_discount(d)?;
        am.discount_percent = Set(d);
    }
    if let Some(s) = input.stock {
        product::validate_stock(s)?;
        am.stock = Set(s);
    }
    if let Some(a) = input.is_active {
        am.is_active = Set(a);
    }
    am.updated_at = Set(Utc::now().into());
    Ok(am.update(db).await?.into())
}

/// Hard delete, unless an order line references the product.
#[instrument(skip(db, store))]
pub async fn delete(db: &DatabaseConnection, store: &ImageStore, id: Uuid) -> Result<DeleteOutcome, ServiceError> {
    let found = product::Entity::find_by_id(id).one(db).await?.ok_or_else(|| ServiceError::not_found("product"))?;
    let referenced = order_item::Entity::find().filter(order_item::Column::ProductId.eq(id)).count(db).await?;
    if referenced > 0 {
        let mut am: product::ActiveModel = found.into();
        am.is_active = Set(false);
        am.updated_at = Set(Utc::now().into());
        am.update(db).await?;
        info!(product_id = %id, "product_deactivated");
        return Ok(DeleteOutcome::Deactivated);
    }
    let files: Vec<String> = product_image::list_for_product(db, id).await?.into_iter().map(|i| i.file_name).collect();
    product::Entity::delete_by_id(id).exec(db).await?;
    store.remove_files(files).await;
    info!(product_id = %id, "product_deleted");
    Ok(DeleteOutcome::Deleted)
}
