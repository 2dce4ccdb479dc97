//! Create `product_image` table; the image bytes live on disk under `storage.images_dir`.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ProductImage::Table)
                    .if_not_exists()
                    .col(uuid(ProductImage::Id).primary_key())
                    .col(uuid(ProductImage::ProductId).not_null())
                    .col(string_len(ProductImage::FileName, 128).not_null())
                    .col(string_len(ProductImage::ContentType, 64).not_null())
                    .col(big_integer(ProductImage::SizeBytes).not_null())
                    .col(integer(ProductImage::Position).not_null())
                    .col(timestamp_with_time_zone(ProductImage::CreatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_product_image_product")
                            .from(ProductImage::Table, ProductImage::ProductId)
                            .to(Product::Table, Product::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(ProductImage::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum ProductImage { Table, Id, ProductId, FileName, ContentType, SizeBytes, Position, CreatedAt }

#[derive(DeriveIden)]
enum Product { Table, Id }
