//! `SeaORM` Entity for children registered at an orphanage.

use sea_orm::entity::prelude::*;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "orphans")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub dob: Date,
    pub gender: String,
    pub orphanage_id: Option<i32>,
    pub health_status: Option<String>,
    pub education_status: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub background_story: Option<String>,
    /// Cached flag, true while an active sponsorship exists.
    pub is_sponsored: bool,
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
    #[sea_orm(has_many = "super::sponsorship::Entity")]
    Sponsorship,
    #[sea_orm(has_many = "super::orphan_update::Entity")]
    OrphanUpdate,
}

impl Related<super::orphanage::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orphanage.def()
    }
}

impl Related<super::sponsorship::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sponsorship.def()
    }
}

impl Related<super::orphan_update::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrphanUpdate.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
