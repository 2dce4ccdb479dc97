//! Product images: files on local disk, metadata in `product_image`.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use models::{product, product_image};
use crate::errors::ServiceError;

/// Where image files live and how they are addressed publicly.
#[derive(Debug, Clone)]
pub struct ImageStore {
    pub dir: PathBuf,
    pub max_bytes: usize,
    pub public_prefix: String,
}

impl ImageStore {
    pub fn from_config(cfg: &configs::StorageConfig) -> Self {
        Self {
            dir: PathBuf::from(&cfg.images_dir),
            max_bytes: cfg.max_image_bytes,
            public_prefix: cfg.public_prefix.trim_end_matches('/').to_string(),
        }
    }

    pub fn url_for(&self, file_name: &str) -> String { format!("{}/{}", self.public_prefix, file_name) }

    fn path_for(&self, file_name: &str) -> PathBuf { self.dir.join(file_name) }

    /// Remove stored files, logging rather than failing on errors.
    pub async fn remove_files(&self, names: impl IntoIterator<Item = String>) {
        for name in names {
            remove_file_quiet(&self.path_for(&name)).await;
        }
    }
}

async fn remove_file_quiet(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(error = %e, path = %path.display(), "failed to remove image file"),
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ImageDto {
    pub id: Uuid,
    pub product_id: Uuid,
    pub url: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub position: i32,
    pub created_at: DateTime<Utc>,
}

impl ImageDto {
    pub fn from_model(m: product_image::Model, store: &ImageStore) -> Self {
        Self {
            id: m.id,
            product_id: m.product_id,
            url: store.url_for(&m.file_name),
            content_type: m.content_type,
            size_bytes: m.size_bytes,
            position: m.position,
            created_at: m.created_at.with_timezone(&Utc),
        }
    }
}

/// Content type implied by the leading magic bytes.
pub fn sniff(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some("image/png")
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some("image/gif")
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("image/webp")
    } else {
        None
    }
}

pub async fn upload(
    db: &DatabaseConnection,
    store: &ImageStore,
    product_id: Uuid,
    content_type: &str,
    bytes: &[u8],
) -> Result<ImageDto, ServiceError> {
    product::Entity::find_by_id(product_id).one(db).await?.ok_or_else(|| ServiceError::not_found("product"))?;
    let ext = product_image::extension_for(content_type)
        .ok_or_else(|| ServiceError::Validation(format!("unsupported image type: {}", content_type)))?;
    if bytes.is_empty() {
        return Err(ServiceError::Validation("image file is empty".into()));
    }
    if bytes.len() > store.max_bytes {
        return Err(ServiceError::Validation(format!("image exceeds {} bytes", store.max_bytes)));
    }
    let declared = product_image::extension_for(content_type);
    if sniff(bytes).and_then(product_image::extension_for) != declared {
        return Err(ServiceError::Validation("file content does not match its content type".into()));
    }

    let position = product_image::Entity::find()
        .filter(product_image::Column::ProductId.eq(product_id))
        .count(db)
        .await? as i32;
    let file_name = format!("{}.{}", Uuid::new_v4(), ext);
    let path = store.path_for(&file_name);
    tokio::fs::create_dir_all(&store.dir).await.map_err(|e| ServiceError::Internal(e.to_string()))?;
    tokio::fs::write(&path, bytes).await.map_err(|e| ServiceError::Internal(e.to_string()))?;

    let row = match product_image::create(db, product_id, &file_name, content_type, bytes.len() as i64, position).await {
        Ok(row) => row,
        Err(e) => {
            remove_file_quiet(&path).await;
            return Err(e.into());
        }
    };
    info!(image_id = %row.id, product_id = %product_id, size = bytes.len(), "image_uploaded");
    Ok(ImageDto::from_model(row, store))
}

pub async fn list(db: &DatabaseConnection, store: &ImageStore, product_id: Uuid) -> Result<Vec<ImageDto>, ServiceError> {
    let rows = product_image::list_for_product(db, product_id).await?;
    Ok(rows.into_iter().map(|m| ImageDto::from_model(m, store)).collect())
}

pub async fn delete(db: &DatabaseConnection, store: &ImageStore, image_id: Uuid) -> Result<(), ServiceError> {
    let row = product_image::Entity::find_by_id(image_id).one(db).await?.ok_or_else(|| ServiceError::not_found("image"))?;
    product_image::Entity::delete_by_id(image_id).exec(db).await?;
    remove_file_quiet(&store.path_for(&row.file_name)).await;
    info!(image_id = %image_id, "image_deleted");
    Ok(())
}
