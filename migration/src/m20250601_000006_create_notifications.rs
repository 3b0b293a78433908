use sea_orm_migration::{prelude::*, schema::*};

use crate::iden::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let table = table_auto(Notifications::Table)
            .col(pk_auto(Notifications::Id))
            .col(integer(Notifications::UserId))
            .col(string(Notifications::Title))
            .col(text(Notifications::Message))
            .col(string_len(Notifications::NotificationType, 32))
            .col(integer_null(Notifications::RelatedId))
            .col(boolean(Notifications::IsRead).default(false))
            .foreign_key(
                ForeignKey::create()
                    .name("fk_notification_user")
                    .from(Notifications::Table, Notifications::UserId)
                    .to(Users::Table, Users::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .to_owned();
        manager.create_table(table).await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_notification_user_read")
                    .table(Notifications::Table)
                    .col(Notifications::UserId)
                    .col(Notifications::IsRead)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Notifications::Table).to_owned())
            .await?;

        Ok(())
    }
}
