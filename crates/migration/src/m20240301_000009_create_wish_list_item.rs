//! Create `wish_list_item` table with a unique (user, product) pair.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(WishListItem::Table)
                    .if_not_exists()
                    .col(uuid(WishListItem::Id).primary_key())
                    .col(uuid(WishListItem::UserId).not_null())
                    .col(uuid(WishListItem::ProductId).not_null())
                    .col(timestamp_with_time_zone(WishListItem::CreatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_wish_list_item_user")
                            .from(WishListItem::Table, WishListItem::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_wish_list_item_product")
                            .from(WishListItem::Table, WishListItem::ProductId)
                            .to(Product::Table, Product::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uniq_wish_list_user_product")
                    .table(WishListItem::Table)
                    .col(WishListItem::UserId)
                    .col(WishListItem::ProductId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(WishListItem::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum WishListItem { Table, Id, UserId, ProductId, CreatedAt }

#[derive(DeriveIden)]
enum User { Table, Id }

#[derive(DeriveIden)]
enum Product { Table, Id }
