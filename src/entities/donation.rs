//! `SeaORM` Entity for donations, both monetary and in-kind.

use sea_orm::entity::prelude::*;
use serde::Serialize;

use super::sea_orm_active_enums::{DonationCategory, DonationStatus};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "donations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub donor_id: i32,
    #[sea_orm(column_type = "Double")]
    pub amount: f64,
    pub donation_type: String,
    pub category: DonationCategory,
    pub status: DonationStatus,
    pub payment_method: Option<String>,
    pub transaction_id: Option<String>,
    pub orphan_id: Option<i32>,
    pub orphanage_id: Option<i32>,
    pub campaign_id: Option<i32>,
    pub sponsorship_id: Option<i32>,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub is_anonymous: bool,
    pub receipt_url: Option<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::DonorId",
        to = "super::user::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Donor,
    #[sea_orm(
        belongs_to = "super::campaign::Entity",
        from = "Column::CampaignId",
        to = "super::campaign::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Campaign,
    #[sea_orm(has_one = "super::delivery::Entity")]
    Delivery,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Donor.def()
    }
}

impl Related<super::campaign::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Campaign.def()
    }
}

impl Related<super::delivery::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Delivery.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Whether this donation counts toward its campaign's running total.
    pub fn counts_toward_campaign(&self) -> bool {
        self.status != DonationStatus::Rejected
    }
}
