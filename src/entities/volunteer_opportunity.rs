//! `SeaORM` Entity for volunteer opportunities posted by orphanages.

use sea_orm::entity::prelude::*;
use serde::Serialize;

use super::sea_orm_active_enums::OpportunityStatus;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "volunteer_opportunities")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub orphanage_id: i32,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub required_skills: Option<String>,
    pub volunteers_needed: i32,
    pub start_date: Date,
    pub end_date: Option<Date>,
    pub status: OpportunityStatus,
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
        on_delete = "Cascade"
    )]
    Orphanage,
    #[sea_orm(has_many = "super::volunteer_application::Entity")]
    Application,
}

impl Related<super::orphanage::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orphanage.def()
    }
}

impl Related<super::volunteer_application::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Application.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
