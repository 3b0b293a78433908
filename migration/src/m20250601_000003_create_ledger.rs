use sea_orm_migration::{prelude::*, schema::*};

use crate::iden::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create Campaigns Table
        let table = table_auto(Campaigns::Table)
            .col(pk_auto(Campaigns::Id))
            .col(string(Campaigns::Title))
            .col(text(Campaigns::Description))
            .col(double(Campaigns::TargetAmount))
            .col(double(Campaigns::CurrentAmount).default(0.0))
            .col(date(Campaigns::StartDate))
            .col(date(Campaigns::EndDate))
            .col(string_len(Campaigns::Status, 32).default("active"))
            .col(integer_null(Campaigns::OrphanageId))
            .col(integer(Campaigns::CreatedBy))
            .foreign_key(
                ForeignKey::create()
                    .name("fk_campaign_orphanage")
                    .from(Campaigns::Table, Campaigns::OrphanageId)
                    .to(Orphanages::Table, Orphanages::Id)
                    .on_delete(ForeignKeyAction::SetNull),
            )
            .foreign_key(
                ForeignKey::create()
                    .name("fk_campaign_creator")
                    .from(Campaigns::Table, Campaigns::CreatedBy)
                    .to(Users::Table, Users::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .check(Expr::col(Campaigns::TargetAmount).gt(0))
            .check(Expr::col(Campaigns::EndDate).gte(Expr::col(Campaigns::StartDate)))
            .to_owned();
        manager.create_table(table).await?;

        // Create Sponsorships Table
        let table = table_auto(Sponsorships::Table)
            .col(pk_auto(Sponsorships::Id))
            .col(integer(Sponsorships::SponsorId))
            .col(integer(Sponsorships::OrphanId))
            .col(double(Sponsorships::MonthlyAmount))
            .col(date(Sponsorships::StartDate))
            .col(date_null(Sponsorships::EndDate))
            .col(string_len(Sponsorships::Status, 32).default("active"))
            .col(string_len(Sponsorships::PaymentFrequency, 32).default("monthly"))
            .col(date_null(Sponsorships::LastPaymentDate))
            .col(date(Sponsorships::NextPaymentDate))
            .col(double(Sponsorships::TotalPaid).default(0.0))
            .col(integer(Sponsorships::PaymentCount).default(0))
            .foreign_key(
                ForeignKey::create()
                    .name("fk_sponsorship_sponsor")
                    .from(Sponsorships::Table, Sponsorships::SponsorId)
                    .to(Users::Table, Users::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .foreign_key(
                ForeignKey::create()
                    .name("fk_sponsorship_orphan")
                    .from(Sponsorships::Table, Sponsorships::OrphanId)
                    .to(Orphans::Table, Orphans::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .check(Expr::col(Sponsorships::MonthlyAmount).gt(0))
            .to_owned();
        manager.create_table(table).await?;

        // Create Donations Table
        let table = table_auto(Donations::Table)
            .col(pk_auto(Donations::Id))
            .col(integer(Donations::DonorId))
            .col(double(Donations::Amount))
            .col(string_len(Donations::DonationType, 32).default("general"))
            .col(string_len(Donations::Category, 32))
            .col(string_len(Donations::Status, 32).default("pending"))
            .col(string_null(Donations::PaymentMethod))
            .col(string_null(Donations::TransactionId))
            .col(integer_null(Donations::OrphanId))
            .col(integer_null(Donations::OrphanageId))
            .col(integer_null(Donations::CampaignId))
            .col(integer_null(Donations::SponsorshipId))
            .col(text_null(Donations::Description))
            .col(boolean(Donations::IsAnonymous).default(false))
            .col(string_null(Donations::ReceiptUrl))
            .foreign_key(
                ForeignKey::create()
                    .name("fk_donation_donor")
                    .from(Donations::Table, Donations::DonorId)
                    .to(Users::Table, Users::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .foreign_key(
                ForeignKey::create()
                    .name("fk_donation_orphan")
                    .from(Donations::Table, Donations::OrphanId)
                    .to(Orphans::Table, Orphans::Id)
                    .on_delete(ForeignKeyAction::SetNull),
            )
            .foreign_key(
                ForeignKey::create()
                    .name("fk_donation_orphanage")
                    .from(Donations::Table, Donations::OrphanageId)
                    .to(Orphanages::Table, Orphanages::Id)
                    .on_delete(ForeignKeyAction::SetNull),
            )
            .foreign_key(
                ForeignKey::create()
                    .name("fk_donation_campaign")
                    .from(Donations::Table, Donations::CampaignId)
                    .to(Campaigns::Table, Campaigns::Id)
                    .on_delete(ForeignKeyAction::SetNull),
            )
            .foreign_key(
                ForeignKey::create()
                    .name("fk_donation_sponsorship")
                    .from(Donations::Table, Donations::SponsorshipId)
                    .to(Sponsorships::Table, Sponsorships::Id)
                    .on_delete(ForeignKeyAction::SetNull),
            )
            .check(Expr::col(Donations::Amount).gt(0))
            .to_owned();
        manager.create_table(table).await?;

        // Create indices for common lookups
        manager
            .create_index(
                Index::create()
                    .name("idx_donation_campaign")
                    .table(Donations::Table)
                    .col(Donations::CampaignId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_donation_donor")
                    .table(Donations::Table)
                    .col(Donations::DonorId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sponsorship_orphan_status")
                    .table(Sponsorships::Table)
                    .col(Sponsorships::OrphanId)
                    .col(Sponsorships::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Donations::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Sponsorships::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Campaigns::Table).to_owned())
            .await?;

        Ok(())
    }
}
