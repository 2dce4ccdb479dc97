//! Create `news_subscription` table.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(NewsSubscription::Table)
                    .if_not_exists()
                    .col(uuid(NewsSubscription::Id).primary_key())
                    .col(string_len(NewsSubscription::Email, 255).unique_key().not_null())
                    .col(timestamp_with_time_zone(NewsSubscription::CreatedAt).not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(NewsSubscription::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum NewsSubscription { Table, Id, Email, CreatedAt }
