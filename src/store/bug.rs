use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

use crate::entity::bug::{self, BugStatus};
use crate::entity::{bug_attachment, bug_tag, tag, time_tracking};
use crate::model::bug::NewBug;
use crate::model::global_error::{AppError, ErrorCode};

pub async fn insert_bug<C: ConnectionTrait>(
    conn: &C,
    project_id: i32,
    fields: &NewBug,
    reported_by: Option<i32>,
) -> Result<bug::Model, AppError> {
    let now = Utc::now();

    let new_bug = bug::ActiveModel {
        project_id: Set(project_id),
        title: Set(fields.title.trim().to_string()),
        description: Set(fields.description.clone()),
        status: Set(BugStatus::Open),
        severity: Set(fields.severity),
        priority: Set(fields.priority),
        assigned_team_id: Set(fields.assigned_team_id),
        assigned_worker_id: Set(fields.assigned_worker_id),
        sprint_id: Set(fields.sprint_id),
        reported_by: Set(reported_by),
        github_issue_url: Set(fields.github_issue_url.clone()),
        created_at: Set(now),
        updated_at: Set(now),
        resolved_at: Set(None),
        auto_close_at: Set(None),
        ..Default::default()
    };

    Ok(new_bug.insert(conn).await?)
}

pub async fn find_bug<C: ConnectionTrait>(conn: &C, bug_id: i32) -> Result<bug::Model, AppError> {
    bug::Entity::find_by_id(bug_id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::with_detail(ErrorCode::BugNotFound, format!("bug #{}", bug_id)))
}

pub async fn save_bug<C: ConnectionTrait>(conn: &C, bug: bug::ActiveModel) -> Result<bug::Model, AppError> {
    Ok(bug.update(conn).await?)
}

/// Ids of resolved bugs whose auto-close deadline is at or before `now`.
pub async fn bugs_due_for_auto_close<C: ConnectionTrait>(
    conn: &C,
    now: DateTime<Utc>,
) -> Result<Vec<i32>, AppError> {
    Ok(bug::Entity::find()
        .select_only()
        .column(bug::Column::Id)
        .filter(bug::Column::Status.eq(BugStatus::Resolved))
        .filter(bug::Column::AutoCloseAt.lte(now))
        .order_by_asc(bug::Column::AutoCloseAt)
        .order_by_asc(bug::Column::Id)
        .into_tuple::<i32>()
        .all(conn)
        .await?)
}

pub async fn bugs_in_sprint<C: ConnectionTrait>(conn: &C, sprint_id: i32) -> Result<Vec<i32>, AppError> {
    Ok(bug::Entity::find()
        .select_only()
        .column(bug::Column::Id)
        .filter(bug::Column::SprintId.eq(sprint_id))
        .order_by_asc(bug::Column::Id)
        .into_tuple::<i32>()
        .all(conn)
        .await?)
}

pub async fn bug_tags<C: ConnectionTrait>(conn: &C, bug_id: i32) -> Result<Vec<String>, AppError> {
    let tags = tag::Entity::find()
        .inner_join(bug_tag::Entity)
        .filter(bug_tag::Column::BugId.eq(bug_id))
        .order_by_asc(tag::Column::Name)
        .all(conn)
        .await?;

    Ok(tags.into_iter().map(|t| t.name).collect())
}

/// Links a tag to a bug. Returns false when the link already existed.
pub async fn attach_tag<C: ConnectionTrait>(conn: &C, bug_id: i32, tag_id: i32) -> Result<bool, AppError> {
    let existing = bug_tag::Entity::find_by_id((bug_id, tag_id)).one(conn).await?;
    if existing.is_some() {
        return Ok(false);
    }

    let link = bug_tag::ActiveModel {
        bug_id: Set(bug_id),
        tag_id: Set(tag_id),
    };
    bug_tag::Entity::insert(link).exec_without_returning(conn).await?;

    Ok(true)
}

/// Unlinks a tag from a bug. Returns false when there was nothing to remove.
pub async fn detach_tag<C: ConnectionTrait>(conn: &C, bug_id: i32, tag_id: i32) -> Result<bool, AppError> {
    let removed = bug_tag::Entity::delete_by_id((bug_id, tag_id))
        .exec(conn)
        .await?
        .rows_affected;

    Ok(removed > 0)
}

pub async fn insert_attachment<C: ConnectionTrait>(
    conn: &C,
    bug_id: i32,
    file: &str,
) -> Result<bug_attachment::Model, AppError> {
    let attachment = bug_attachment::ActiveModel {
        bug_id: Set(bug_id),
        file: Set(file.to_string()),
        uploaded_at: Set(Utc::now()),
        ..Default::default()
    };

    Ok(attachment.insert(conn).await?)
}

pub async fn bug_attachments<C: ConnectionTrait>(
    conn: &C,
    bug_id: i32,
) -> Result<Vec<bug_attachment::Model>, AppError> {
    Ok(bug_attachment::Entity::find()
        .filter(bug_attachment::Column::BugId.eq(bug_id))
        .order_by_asc(bug_attachment::Column::Id)
        .all(conn)
        .await?)
}

/// Adds `secs` to the single time entry kept per (bug, worker), creating it on first use.
pub async fn add_time<C: ConnectionTrait>(
    conn: &C,
    bug_id: i32,
    worker_id: i32,
    secs: i64,
) -> Result<time_tracking::Model, AppError> {
    if secs < 0 {
        return Err(AppError::bad_request(ErrorCode::InvalidDuration));
    }

    let existing = time_tracking::Entity::find()
        .filter(time_tracking::Column::BugId.eq(bug_id))
        .filter(time_tracking::Column::WorkerId.eq(worker_id))
        .one(conn)
        .await?;

    match existing {
        Some(entry) => {
            let total = entry.time_spent_secs.saturating_add(secs);
            let mut entry: time_tracking::ActiveModel = entry.into();
            entry.time_spent_secs = Set(total);
            Ok(entry.update(conn).await?)
        }
        None => {
            let entry = time_tracking::ActiveModel {
                bug_id: Set(bug_id),
                worker_id: Set(worker_id),
                time_spent_secs: Set(secs),
                ..Default::default()
            };
            Ok(entry.insert(conn).await?)
        }
    }
}

pub async fn time_entries<C: ConnectionTrait>(
    conn: &C,
    bug_id: i32,
) -> Result<Vec<time_tracking::Model>, AppError> {
    Ok(time_tracking::Entity::find()
        .filter(time_tracking::Column::BugId.eq(bug_id))
        .order_by_asc(time_tracking::Column::WorkerId)
        .all(conn)
        .await?)
}
