//! `SeaORM` Entity for in-kind delivery tracking, one row per in-kind donation.

use sea_orm::entity::prelude::*;
use serde::Serialize;

use super::sea_orm_active_enums::DeliveryStatus;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "delivery_tracking")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub donation_id: i32,
    pub status: DeliveryStatus,
    pub pickup_address: Option<String>,
    pub delivery_address: Option<String>,
    pub carrier: Option<String>,
    pub tracking_number: Option<String>,
    pub estimated_delivery: Option<Date>,
    pub actual_delivery: Option<Date>,
    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::donation::Entity",
        from = "Column::DonationId",
        to = "super::donation::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Donation,
    #[sea_orm(has_many = "super::delivery_status_history::Entity")]
    History,
}

impl Related<super::donation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Donation.def()
    }
}

impl Related<super::delivery_status_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::History.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
