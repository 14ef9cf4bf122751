use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Directed edge: `bug_id` is blocked by `depends_on_id`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bug_dependencies")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub bug_id: i32,

    #[sea_orm(primary_key, auto_increment = false)]
    pub depends_on_id: i32,

    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::bug::Entity",
        from = "Column::BugId",
        to = "super::bug::Column::Id",
        on_delete = "Cascade",
        fk_name = "fk_dependency_bug"
    )]
    Bug,

    #[sea_orm(
        belongs_to = "super::bug::Entity",
        from = "Column::DependsOnId",
        to = "super::bug::Column::Id",
        on_delete = "Cascade",
        fk_name = "fk_dependency_blocker"
    )]
    Blocker,
}

impl ActiveModelBehavior for ActiveModel {}
