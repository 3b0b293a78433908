use sea_orm_migration::{prelude::*, schema::*};

use crate::iden::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // One tracking row per in-kind donation
        let table = table_auto(DeliveryTracking::Table)
            .col(pk_auto(DeliveryTracking::Id))
            .col(integer_uniq(DeliveryTracking::DonationId))
            .col(string_len(DeliveryTracking::Status, 32).default("preparing"))
            .col(string_null(DeliveryTracking::PickupAddress))
            .col(string_null(DeliveryTracking::DeliveryAddress))
            .col(string_null(DeliveryTracking::Carrier))
            .col(string_null(DeliveryTracking::TrackingNumber))
            .col(date_null(DeliveryTracking::EstimatedDelivery))
            .col(date_null(DeliveryTracking::ActualDelivery))
            .col(text_null(DeliveryTracking::Notes))
            .foreign_key(
                ForeignKey::create()
                    .name("fk_delivery_donation")
                    .from(DeliveryTracking::Table, DeliveryTracking::DonationId)
                    .to(Donations::Table, Donations::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .to_owned();
        manager.create_table(table).await?;

        // Append-only status log
        let table = table_auto(DeliveryStatusHistory::Table)
            .col(pk_auto(DeliveryStatusHistory::Id))
            .col(integer(DeliveryStatusHistory::DeliveryId))
            .col(string_len(DeliveryStatusHistory::Status, 32))
            .col(integer_null(DeliveryStatusHistory::ChangedBy))
            .foreign_key(
                ForeignKey::create()
                    .name("fk_delivery_history_delivery")
                    .from(DeliveryStatusHistory::Table, DeliveryStatusHistory::DeliveryId)
                    .to(DeliveryTracking::Table, DeliveryTracking::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .foreign_key(
                ForeignKey::create()
                    .name("fk_delivery_history_user")
                    .from(DeliveryStatusHistory::Table, DeliveryStatusHistory::ChangedBy)
                    .to(Users::Table, Users::Id)
                    .on_delete(ForeignKeyAction::SetNull),
            )
            .to_owned();
        manager.create_table(table).await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_delivery_history_delivery")
                    .table(DeliveryStatusHistory::Table)
                    .col(DeliveryStatusHistory::DeliveryId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DeliveryStatusHistory::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(DeliveryTracking::Table).to_owned())
            .await?;

        Ok(())
    }
}
