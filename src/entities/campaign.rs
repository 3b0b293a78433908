//! `SeaORM` Entity for fundraising campaigns.

use sea_orm::entity::prelude::*;
use serde::Serialize;

use super::sea_orm_active_enums::CampaignStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "campaigns")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    #[sea_orm(column_type = "Double")]
    pub target_amount: f64,
    /// Running total of every non-rejected donation against this campaign.
    #[sea_orm(column_type = "Double")]
    pub current_amount: f64,
    pub start_date: Date,
    pub end_date: Date,
    pub status: CampaignStatus,
    pub orphanage_id: Option<i32>,
    pub created_by: i32,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::orphanage::Entity",
        from = "Column::OrphanageId",
        to = "super::orphanage::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Orphanage,
    #[sea_orm(has_many = "super::donation::Entity")]
    Donation,
}

impl Related<super::orphanage::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orphanage.def()
    }
}

impl Related<super::donation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Donation.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn progress_percentage(&self) -> i64 {
        if self.target_amount <= 0.0 {
            return 0;
        }
        let pct = (self.current_amount / self.target_amount * 100.0).round() as i64;
        pct.clamp(0, 100)
    }
}
