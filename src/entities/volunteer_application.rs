//! `SeaORM` Entity for volunteer applications, one per (volunteer, opportunity).

use sea_orm::entity::prelude::*;
use serde::Serialize;

use super::sea_orm_active_enums::ApplicationStatus;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "volunteer_applications")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub volunteer_id: i32,
    pub opportunity_id: i32,
    #[sea_orm(column_type = "Text", nullable)]
    pub message: Option<String>,
    pub resume_url: Option<String>,
    pub status: ApplicationStatus,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::volunteer_opportunity::Entity",
        from = "Column::OpportunityId",
        to = "super::volunteer_opportunity::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Opportunity,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::VolunteerId",
        to = "super::user::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Volunteer,
}

impl Related<super::volunteer_opportunity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Opportunity.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Volunteer.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
