use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tags")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::bug_tag::Entity")]
    BugTag,
}

impl Related<super::bug_tag::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BugTag.def()
    }
}

impl Related<super::bug::Entity> for Entity {
    fn to() -> RelationDef {
        super::bug_tag::Relation::Bug.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::bug_tag::Relation::Tag.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
