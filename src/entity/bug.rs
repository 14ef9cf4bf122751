use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::StringLen;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::global_error::{AppError, ErrorCode};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bugs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub project_id: i32,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub status: BugStatus,
    pub severity: Severity,
    pub priority: Priority,
    pub assigned_team_id: Option<i32>,
    pub assigned_worker_id: Option<i32>,
    pub sprint_id: Option<i32>,
    pub reported_by: Option<i32>,
    pub github_issue_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    // set when the bug enters `resolved`, kept on close, cleared on reopen
    pub resolved_at: Option<DateTime<Utc>>,
    // pending auto-close deadline, only present while resolved
    pub auto_close_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, DeriveActiveEnum, ToSchema)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum BugStatus {
    #[sea_orm(string_value = "open")]
    Open,

    #[sea_orm(string_value = "in_progress")]
    InProgress,

    #[sea_orm(string_value = "resolved")]
    Resolved,

    #[sea_orm(string_value = "closed")]
    Closed,
}

impl BugStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BugStatus::Open => "open",
            BugStatus::InProgress => "in_progress",
            BugStatus::Resolved => "resolved",
            BugStatus::Closed => "closed",
        }
    }

    /// Resolved or closed bugs no longer block their dependents.
    pub fn is_settled(&self) -> bool {
        matches!(self, BugStatus::Resolved | BugStatus::Closed)
    }
}

impl fmt::Display for BugStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BugStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(BugStatus::Open),
            "in_progress" => Ok(BugStatus::InProgress),
            "resolved" => Ok(BugStatus::Resolved),
            "closed" => Ok(BugStatus::Closed),
            other => Err(AppError::with_detail(
                ErrorCode::InvalidStatus,
                format!("unknown status '{}'", other),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum, ToSchema, Default)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[sea_orm(string_value = "low")]
    Low,

    #[default]
    #[sea_orm(string_value = "medium")]
    Medium,

    #[sea_orm(string_value = "high")]
    High,

    #[sea_orm(string_value = "critical")]
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum, ToSchema, Default)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    #[sea_orm(string_value = "low")]
    Low,

    #[default]
    #[sea_orm(string_value = "medium")]
    Medium,

    #[sea_orm(string_value = "high")]
    High,

    #[sea_orm(string_value = "urgent")]
    Urgent,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::project::Entity",
        from = "Column::ProjectId",
        to = "super::project::Column::Id",
        on_delete = "Cascade",
        fk_name = "fk_bug_project"
    )]
    Project,

    #[sea_orm(
        belongs_to = "super::team::Entity",
        from = "Column::AssignedTeamId",
        to = "super::team::Column::Id",
        on_delete = "SetNull",
        fk_name = "fk_bug_team"
    )]
    Team,

    #[sea_orm(
        belongs_to = "super::worker::Entity",
        from = "Column::AssignedWorkerId",
        to = "super::worker::Column::Id",
        on_delete = "SetNull",
        fk_name = "fk_bug_worker"
    )]
    Worker,

    #[sea_orm(
        belongs_to = "super::sprint::Entity",
        from = "Column::SprintId",
        to = "super::sprint::Column::Id",
        on_delete = "SetNull",
        fk_name = "fk_bug_sprint"
    )]
    Sprint,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::ReportedBy",
        to = "super::user::Column::Id",
        on_delete = "SetNull",
        fk_name = "fk_bug_reporter"
    )]
    Reporter,

    #[sea_orm(has_many = "super::bug_attachment::Entity")]
    Attachment,

    #[sea_orm(has_many = "super::time_tracking::Entity")]
    TimeTracking,
}

impl Related<super::project::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Project.def()
    }
}

impl Related<super::sprint::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sprint.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reporter.def()
    }
}

impl Related<super::bug_attachment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Attachment.def()
    }
}

impl Related<super::time_tracking::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TimeTracking.def()
    }
}

impl Related<super::tag::Entity> for Entity {
    fn to() -> RelationDef {
        super::bug_tag::Relation::Tag.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::bug_tag::Relation::Bug.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
