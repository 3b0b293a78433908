//! `SeaORM` Entity for progress updates posted about an orphan.

use sea_orm::entity::prelude::*;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "orphan_updates")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub orphan_id: i32,
    pub update_type: String,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub created_by: i32,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::orphan::Entity",
        from = "Column::OrphanId",
        to = "super::orphan::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Orphan,
}

impl Related<super::orphan::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orphan.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
