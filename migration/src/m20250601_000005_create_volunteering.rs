use sea_orm_migration::{prelude::*, schema::*};

use crate::iden::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let table = table_auto(VolunteerOpportunities::Table)
            .col(pk_auto(VolunteerOpportunities::Id))
            .col(integer(VolunteerOpportunities::OrphanageId))
            .col(string(VolunteerOpportunities::Title))
            .col(text(VolunteerOpportunities::Description))
            .col(string_null(VolunteerOpportunities::RequiredSkills))
            .col(integer(VolunteerOpportunities::VolunteersNeeded).default(1))
            .col(date(VolunteerOpportunities::StartDate))
            .col(date_null(VolunteerOpportunities::EndDate))
            .col(string_len(VolunteerOpportunities::Status, 32).default("open"))
            .col(integer(VolunteerOpportunities::CreatedBy))
            .foreign_key(
                ForeignKey::create()
                    .name("fk_opportunity_orphanage")
                    .from(VolunteerOpportunities::Table, VolunteerOpportunities::OrphanageId)
                    .to(Orphanages::Table, Orphanages::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .foreign_key(
                ForeignKey::create()
                    .name("fk_opportunity_creator")
                    .from(VolunteerOpportunities::Table, VolunteerOpportunities::CreatedBy)
                    .to(Users::Table, Users::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .to_owned();
        manager.create_table(table).await?;

        let table = table_auto(VolunteerApplications::Table)
            .col(pk_auto(VolunteerApplications::Id))
            .col(integer(VolunteerApplications::VolunteerId))
            .col(integer(VolunteerApplications::OpportunityId))
            .col(text_null(VolunteerApplications::Message))
            .col(string_null(VolunteerApplications::ResumeUrl))
            .col(string_len(VolunteerApplications::Status, 32).default("pending"))
            .foreign_key(
                ForeignKey::create()
                    .name("fk_application_volunteer")
                    .from(VolunteerApplications::Table, VolunteerApplications::VolunteerId)
                    .to(Users::Table, Users::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .foreign_key(
                ForeignKey::create()
                    .name("fk_application_opportunity")
                    .from(VolunteerApplications::Table, VolunteerApplications::OpportunityId)
                    .to(VolunteerOpportunities::Table, VolunteerOpportunities::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .to_owned();
        manager.create_table(table).await?;

        // One application per (volunteer, opportunity)
        manager
            .create_index(
                Index::create()
                    .name("uq_application_volunteer_opportunity")
                    .table(VolunteerApplications::Table)
                    .col(VolunteerApplications::VolunteerId)
                    .col(VolunteerApplications::OpportunityId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(VolunteerApplications::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(VolunteerOpportunities::Table).to_owned())
            .await?;

        Ok(())
    }
}
