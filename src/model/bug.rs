use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entity::activity_log::Model as ActivityLogModel;
use crate::entity::bug::{BugStatus, Model as BugModel, Priority, Severity};
use crate::entity::time_tracking::Model as TimeTrackingModel;

/// Fields accepted when a bug is reported.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewBug {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub priority: Priority,
    pub assigned_team_id: Option<i32>,
    pub assigned_worker_id: Option<i32>,
    pub sprint_id: Option<i32>,
    pub github_issue_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BugStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BugAssigneeRequest {
    pub worker_id: Option<i32>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DependencyRequest {
    pub depends_on_id: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TimeLogRequest {
    pub worker_id: i32,
    pub seconds: i64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BugResponse {
    pub id: i32,
    pub project_id: i32,
    pub title: String,
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
    pub resolved_at: Option<DateTime<Utc>>,
    pub auto_close_at: Option<DateTime<Utc>>,
}

impl From<BugModel> for BugResponse {
    fn from(model: BugModel) -> Self {
        Self {
            id: model.id,
            project_id: model.project_id,
            title: model.title,
            description: model.description,
            status: model.status,
            severity: model.severity,
            priority: model.priority,
            assigned_team_id: model.assigned_team_id,
            assigned_worker_id: model.assigned_worker_id,
            sprint_id: model.sprint_id,
            reported_by: model.reported_by,
            github_issue_url: model.github_issue_url,
            created_at: model.created_at,
            updated_at: model.updated_at,
            resolved_at: model.resolved_at,
            auto_close_at: model.auto_close_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BugDetailResponse {
    pub bug: BugResponse,
    pub tags: Vec<String>,
    pub depends_on: Vec<i32>,
    pub blocks: Vec<i32>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TimeTrackingResponse {
    pub id: i32,
    pub bug_id: i32,
    pub worker_id: i32,
    pub time_spent_secs: i64,
}

impl From<TimeTrackingModel> for TimeTrackingResponse {
    fn from(model: TimeTrackingModel) -> Self {
        Self {
            id: model.id,
            bug_id: model.bug_id,
            worker_id: model.worker_id,
            time_spent_secs: model.time_spent_secs,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActivityResponse {
    pub id: i32,
    pub project_id: i32,
    pub bug_id: Option<i32>,
    pub worker_id: Option<i32>,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl From<ActivityLogModel> for ActivityResponse {
    fn from(model: ActivityLogModel) -> Self {
        Self {
            id: model.id,
            project_id: model.project_id,
            bug_id: model.bug_id,
            worker_id: model.worker_id,
            message: model.message,
            created_at: model.created_at,
        }
    }
}
