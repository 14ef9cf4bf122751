use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set};

use crate::entity::{activity_log, notification};
use crate::model::global_error::{AppError, ErrorCode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityScope {
    Project(i32),
    Bug(i32),
}

pub async fn insert_activity<C: ConnectionTrait>(
    conn: &C,
    project_id: i32,
    bug_id: Option<i32>,
    worker_id: Option<i32>,
    message: &str,
) -> Result<activity_log::Model, AppError> {
    let entry = activity_log::ActiveModel {
        project_id: Set(project_id),
        bug_id: Set(bug_id),
        worker_id: Set(worker_id),
        message: Set(message.to_string()),
        created_at: Set(Utc::now()),
        ..Default::default()
    };

    Ok(entry.insert(conn).await?)
}

/// Activity entries for a project or bug, newest first.
pub async fn list_activity<C: ConnectionTrait>(
    conn: &C,
    scope: ActivityScope,
) -> Result<Vec<activity_log::Model>, AppError> {
    let query = match scope {
        ActivityScope::Project(project_id) => {
            activity_log::Entity::find().filter(activity_log::Column::ProjectId.eq(project_id))
        }
        ActivityScope::Bug(bug_id) => {
            activity_log::Entity::find().filter(activity_log::Column::BugId.eq(bug_id))
        }
    };

    Ok(query
        .order_by_desc(activity_log::Column::CreatedAt)
        .order_by_desc(activity_log::Column::Id)
        .all(conn)
        .await?)
}

pub async fn insert_notification<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    message: &str,
) -> Result<notification::Model, AppError> {
    let entry = notification::ActiveModel {
        user_id: Set(user_id),
        message: Set(message.to_string()),
        is_read: Set(false),
        created_at: Set(Utc::now()),
        ..Default::default()
    };

    Ok(entry.insert(conn).await?)
}

pub async fn list_notifications<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
) -> Result<Vec<notification::Model>, AppError> {
    Ok(notification::Entity::find()
        .filter(notification::Column::UserId.eq(user_id))
        .order_by_desc(notification::Column::CreatedAt)
        .order_by_desc(notification::Column::Id)
        .all(conn)
        .await?)
}

pub async fn find_notification<C: ConnectionTrait>(
    conn: &C,
    notification_id: i32,
) -> Result<notification::Model, AppError> {
    notification::Entity::find_by_id(notification_id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::not_found(ErrorCode::NotificationNotFound))
}

pub async fn mark_read<C: ConnectionTrait>(
    conn: &C,
    notification: notification::Model,
) -> Result<notification::Model, AppError> {
    if notification.is_read {
        return Ok(notification);
    }

    let mut entry: notification::ActiveModel = notification.into();
    entry.is_read = Set(true);
    Ok(entry.update(conn).await?)
}
