use chrono::{NaiveDate, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};

use crate::entity::worker::WorkerRole;
use crate::entity::{project, sprint, tag, team, user, worker, workspace};
use crate::model::global_error::{AppError, ErrorCode};

pub async fn create_user<C: ConnectionTrait>(
    conn: &C,
    username: &str,
    email: &str,
    role: &str,
) -> Result<user::Model, AppError> {
    let new_user = user::ActiveModel {
        username: Set(username.to_string()),
        email: Set(email.to_string()),
        role: Set(role.to_string()),
        created_at: Set(Utc::now()),
        ..Default::default()
    };

    Ok(new_user.insert(conn).await?)
}

pub async fn create_workspace<C: ConnectionTrait>(
    conn: &C,
    name: &str,
    description: Option<&str>,
) -> Result<workspace::Model, AppError> {
    let new_workspace = workspace::ActiveModel {
        name: Set(name.to_string()),
        description: Set(description.map(str::to_string)),
        created_at: Set(Utc::now()),
        ..Default::default()
    };

    Ok(new_workspace.insert(conn).await?)
}

pub async fn create_team<C: ConnectionTrait>(
    conn: &C,
    workspace_id: i32,
    name: &str,
) -> Result<team::Model, AppError> {
    workspace::Entity::find_by_id(workspace_id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::not_found(ErrorCode::WorkspaceNotFound))?;

    let new_team = team::ActiveModel {
        workspace_id: Set(workspace_id),
        name: Set(name.to_string()),
        created_at: Set(Utc::now()),
        ..Default::default()
    };

    Ok(new_team.insert(conn).await?)
}

pub async fn create_worker<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    team_id: Option<i32>,
    role: WorkerRole,
) -> Result<worker::Model, AppError> {
    find_user(conn, user_id).await?;

    if let Some(team_id) = team_id {
        find_team(conn, team_id).await?;
    }

    let new_worker = worker::ActiveModel {
        user_id: Set(user_id),
        team_id: Set(team_id),
        role: Set(role),
        joined_at: Set(Utc::now()),
        ..Default::default()
    };

    Ok(new_worker.insert(conn).await?)
}

pub async fn create_project<C: ConnectionTrait>(
    conn: &C,
    workspace_id: i32,
    name: &str,
    assigned_team_id: Option<i32>,
) -> Result<project::Model, AppError> {
    workspace::Entity::find_by_id(workspace_id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::not_found(ErrorCode::WorkspaceNotFound))?;

    let new_project = project::ActiveModel {
        workspace_id: Set(workspace_id),
        assigned_team_id: Set(assigned_team_id),
        name: Set(name.to_string()),
        description: Set(None),
        github_repo: Set(None),
        created_at: Set(Utc::now()),
        ..Default::default()
    };

    Ok(new_project.insert(conn).await?)
}

pub async fn create_sprint<C: ConnectionTrait>(
    conn: &C,
    project_id: i32,
    name: &str,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<sprint::Model, AppError> {
    if start_date > end_date {
        return Err(AppError::with_detail(
            ErrorCode::ValidationError,
            format!("sprint starts on {} but ends on {}", start_date, end_date),
        ));
    }

    find_project(conn, project_id).await?;

    let new_sprint = sprint::ActiveModel {
        project_id: Set(project_id),
        name: Set(name.to_string()),
        start_date: Set(start_date),
        end_date: Set(end_date),
        is_active: Set(true),
        ..Default::default()
    };

    Ok(new_sprint.insert(conn).await?)
}

/// Removes the sprint row. Bugs still pointing at it are nulled by the foreign key.
pub async fn delete_sprint<C: ConnectionTrait>(conn: &C, sprint_id: i32) -> Result<(), AppError> {
    sprint::Entity::delete_by_id(sprint_id).exec(conn).await?;
    Ok(())
}

pub async fn find_user<C: ConnectionTrait>(conn: &C, user_id: i32) -> Result<user::Model, AppError> {
    user::Entity::find_by_id(user_id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::with_detail(ErrorCode::UserNotFound, format!("user #{}", user_id)))
}

pub async fn find_project<C: ConnectionTrait>(conn: &C, project_id: i32) -> Result<project::Model, AppError> {
    project::Entity::find_by_id(project_id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::not_found(ErrorCode::ProjectNotFound))
}

pub async fn find_team<C: ConnectionTrait>(conn: &C, team_id: i32) -> Result<team::Model, AppError> {
    team::Entity::find_by_id(team_id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::not_found(ErrorCode::TeamNotFound))
}

pub async fn find_sprint<C: ConnectionTrait>(conn: &C, sprint_id: i32) -> Result<sprint::Model, AppError> {
    sprint::Entity::find_by_id(sprint_id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::not_found(ErrorCode::SprintNotFound))
}

pub async fn find_worker<C: ConnectionTrait>(conn: &C, worker_id: i32) -> Result<worker::Model, AppError> {
    worker::Entity::find_by_id(worker_id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::not_found(ErrorCode::WorkerNotFound))
}

pub async fn find_worker_by_user<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
) -> Result<Option<worker::Model>, AppError> {
    Ok(worker::Entity::find()
        .filter(worker::Column::UserId.eq(user_id))
        .one(conn)
        .await?)
}

pub async fn find_tag<C: ConnectionTrait>(conn: &C, name: &str) -> Result<Option<tag::Model>, AppError> {
    Ok(tag::Entity::find()
        .filter(tag::Column::Name.eq(name))
        .one(conn)
        .await?)
}

pub async fn find_or_create_tag<C: ConnectionTrait>(conn: &C, name: &str) -> Result<tag::Model, AppError> {
    if let Some(existing) = find_tag(conn, name).await? {
        return Ok(existing);
    }

    let new_tag = tag::ActiveModel {
        name: Set(name.to_string()),
        ..Default::default()
    };

    Ok(new_tag.insert(conn).await?)
}
