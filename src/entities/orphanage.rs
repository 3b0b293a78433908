//! `SeaORM` Entity for orphanages.

use sea_orm::entity::prelude::*;
use serde::Serialize;

use super::sea_orm_active_enums::VerificationStatus;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "orphanages")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub location: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub contact_person_id: Option<i32>,
    pub verification_status: VerificationStatus,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::ContactPersonId",
        to = "super::user::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    ContactPerson,
    #[sea_orm(has_many = "super::orphan::Entity")]
    Orphan,
    #[sea_orm(has_many = "super::review::Entity")]
    Review,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ContactPerson.def()
    }
}

impl Related<super::orphan::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orphan.def()
    }
}

impl Related<super::review::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Review.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
