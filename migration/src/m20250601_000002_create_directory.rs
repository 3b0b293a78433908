use sea_orm_migration::{prelude::*, schema::*};

use crate::iden::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create Orphanages Table
        let table = table_auto(Orphanages::Table)
            .col(pk_auto(Orphanages::Id))
            .col(string(Orphanages::Name))
            .col(text_null(Orphanages::Description))
            .col(string(Orphanages::Location))
            .col(string_null(Orphanages::Address))
            .col(string_null(Orphanages::Phone))
            .col(string_null(Orphanages::Email))
            .col(integer_null(Orphanages::ContactPersonId))
            .col(string_len(Orphanages::VerificationStatus, 32).default("pending"))
            .foreign_key(
                ForeignKey::create()
                    .name("fk_orphanage_contact_person")
                    .from(Orphanages::Table, Orphanages::ContactPersonId)
                    .to(Users::Table, Users::Id)
                    .on_delete(ForeignKeyAction::SetNull),
            )
            .to_owned();
        manager.create_table(table).await?;

        // Create Orphans Table
        let table = table_auto(Orphans::Table)
            .col(pk_auto(Orphans::Id))
            .col(string(Orphans::FirstName))
            .col(string(Orphans::LastName))
            .col(date(Orphans::Dob))
            .col(string_len(Orphans::Gender, 16))
            .col(integer_null(Orphans::OrphanageId))
            .col(string_null(Orphans::HealthStatus))
            .col(string_null(Orphans::EducationStatus))
            .col(text_null(Orphans::BackgroundStory))
            .col(boolean(Orphans::IsSponsored).default(false))
            .foreign_key(
                ForeignKey::create()
                    .name("fk_orphan_orphanage")
                    .from(Orphans::Table, Orphans::OrphanageId)
                    .to(Orphanages::Table, Orphanages::Id)
                    .on_delete(ForeignKeyAction::SetNull),
            )
            .to_owned();
        manager.create_table(table).await?;

        // Create OrphanUpdates Table
        let table = table_auto(OrphanUpdates::Table)
            .col(pk_auto(OrphanUpdates::Id))
            .col(integer(OrphanUpdates::OrphanId))
            .col(string_len(OrphanUpdates::UpdateType, 32))
            .col(string(OrphanUpdates::Title))
            .col(text(OrphanUpdates::Description))
            .col(integer(OrphanUpdates::CreatedBy))
            .foreign_key(
                ForeignKey::create()
                    .name("fk_orphan_update_orphan")
                    .from(OrphanUpdates::Table, OrphanUpdates::OrphanId)
                    .to(Orphans::Table, Orphans::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .foreign_key(
                ForeignKey::create()
                    .name("fk_orphan_update_author")
                    .from(OrphanUpdates::Table, OrphanUpdates::CreatedBy)
                    .to(Users::Table, Users::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .to_owned();
        manager.create_table(table).await?;

        // Create Reviews Table
        let table = table_auto(Reviews::Table)
            .col(pk_auto(Reviews::Id))
            .col(integer(Reviews::UserId))
            .col(integer(Reviews::OrphanageId))
            .col(integer(Reviews::Rating))
            .col(text_null(Reviews::Comment))
            .foreign_key(
                ForeignKey::create()
                    .name("fk_review_user")
                    .from(Reviews::Table, Reviews::UserId)
                    .to(Users::Table, Users::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .foreign_key(
                ForeignKey::create()
                    .name("fk_review_orphanage")
                    .from(Reviews::Table, Reviews::OrphanageId)
                    .to(Orphanages::Table, Orphanages::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .check(
                Expr::col(Reviews::Rating)
                    .gte(1)
                    .and(Expr::col(Reviews::Rating).lte(5)),
            )
            .to_owned();
        manager.create_table(table).await?;

        // One review per (user, orphanage)
        manager
            .create_index(
                Index::create()
                    .name("uq_review_user_orphanage")
                    .table(Reviews::Table)
                    .col(Reviews::UserId)
                    .col(Reviews::OrphanageId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_orphan_orphanage")
                    .table(Orphans::Table)
                    .col(Orphans::OrphanageId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop all tables in reverse order to avoid foreign key constraints
        manager
            .drop_table(Table::drop().table(Reviews::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(OrphanUpdates::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Orphans::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Orphanages::Table).to_owned())
            .await?;

        Ok(())
    }
}
