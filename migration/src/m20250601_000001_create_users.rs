use sea_orm_migration::{prelude::*, schema::*};

use crate::iden::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let table = table_auto(Users::Table)
            .col(pk_auto(Users::Id))
            .col(string_uniq(Users::Email))
            .col(string(Users::PasswordHash))
            .col(string(Users::FirstName))
            .col(string(Users::LastName))
            .col(string_len(Users::Role, 32))
            .col(string_null(Users::Phone))
            .col(string_null(Users::Address))
            .col(boolean(Users::IsVerified).default(false))
            .col(string_null(Users::VerificationToken))
            .col(string_null(Users::ResetPasswordToken))
            .col(timestamp_null(Users::ResetPasswordExpires))
            .to_owned();
        manager.create_table(table).await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_users_verification_token")
                    .table(Users::Table)
                    .col(Users::VerificationToken)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;

        Ok(())
    }
}
