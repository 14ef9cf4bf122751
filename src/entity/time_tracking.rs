use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "time_tracking")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub bug_id: i32,
    pub worker_id: i32,
    pub time_spent_secs: i64,
}

impl Model {
    pub fn time_spent(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.time_spent_secs)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::bug::Entity",
        from = "Column::BugId",
        to = "super::bug::Column::Id",
        on_delete = "Cascade",
        fk_name = "fk_time_bug"
    )]
    Bug,

    #[sea_orm(
        belongs_to = "super::worker::Entity",
        from = "Column::WorkerId",
        to = "super::worker::Column::Id",
        on_delete = "Cascade",
        fk_name = "fk_time_worker"
    )]
    Worker,
}

impl Related<super::bug::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Bug.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
