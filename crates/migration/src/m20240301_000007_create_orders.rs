//! Create `orders` table (plural to stay clear of the SQL keyword).
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Orders::Table)
                    .if_not_exists()
                    .col(uuid(Orders::Id).primary_key())
                    .col(uuid(Orders::UserId).not_null())
                    .col(string_len(Orders::Status, 16).not_null())
                    .col(string_len(Orders::PaymentStatus, 16).not_null())
                    .col(big_integer(Orders::SubtotalCents).not_null())
                    .col(big_integer(Orders::DiscountCents).not_null())
                    .col(big_integer(Orders::TotalCents).not_null())
                    .col(string_len(Orders::RecipientName, 128).not_null())
                    .col(string_len(Orders::Phone, 32).not_null())
                    .col(string_len(Orders::City, 128).not_null())
                    .col(string_len(Orders::Warehouse, 256).not_null())
                    .col(ColumnDef::new(Orders::Comment).text().null())
                    .col(ColumnDef::new(Orders::StripeSessionId).string_len(255).null())
                    .col(timestamp_with_time_zone(Orders::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Orders::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_orders_user")
                            .from(Orders::Table, Orders::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Orders::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Orders {
    Table,
    Id,
    UserId,
    Status,
    PaymentStatus,
    SubtotalCents,
    DiscountCents,
    TotalCents,
    RecipientName,
    Phone,
    City,
    Warehouse,
    Comment,
    StripeSessionId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum User { Table, Id }
