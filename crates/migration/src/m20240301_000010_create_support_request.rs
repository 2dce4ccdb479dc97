//! Create `support_request` table. Anonymous visitors may submit, so `user_id` is nullable.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SupportRequest::Table)
                    .if_not_exists()
                    .col(uuid(SupportRequest::Id).primary_key())
                    .col(ColumnDef::new(SupportRequest::UserId).uuid().null())
                    .col(string_len(SupportRequest::Name, 128).not_null())
                    .col(string_len(SupportRequest::Email, 255).not_null())
                    .col(string_len(SupportRequest::Subject, 200).not_null())
                    .col(text(SupportRequest::Message).not_null())
                    .col(string_len(SupportRequest::Status, 16).not_null())
                    .col(timestamp_with_time_zone(SupportRequest::CreatedAt).not_null())
                    .col(ColumnDef::new(SupportRequest::ResolvedAt).timestamp_with_time_zone().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_support_request_user")
                            .from(SupportRequest::Table, SupportRequest::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(SupportRequest::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum SupportRequest { Table, Id, UserId, Name, Email, Subject, Message, Status, CreatedAt, ResolvedAt }

#[derive(DeriveIden)]
enum User { Table, Id }
