//! `SeaORM` Entity for recurring orphan sponsorships.

use sea_orm::entity::prelude::*;
use serde::Serialize;

use super::sea_orm_active_enums::{PaymentFrequency, SponsorshipStatus};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "sponsorships")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub sponsor_id: i32,
    pub orphan_id: i32,
    #[sea_orm(column_type = "Double")]
    pub monthly_amount: f64,
    pub start_date: Date,
    pub end_date: Option<Date>,
    pub status: SponsorshipStatus,
    pub payment_frequency: PaymentFrequency,
    pub last_payment_date: Option<Date>,
    pub next_payment_date: Date,
    #[sea_orm(column_type = "Double")]
    pub total_paid: f64,
    pub payment_count: i32,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::SponsorId",
        to = "super::user::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Sponsor,
    #[sea_orm(
        belongs_to = "super::orphan::Entity",
        from = "Column::OrphanId",
        to = "super::orphan::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Orphan,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sponsor.def()
    }
}

impl Related<super::orphan::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orphan.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
