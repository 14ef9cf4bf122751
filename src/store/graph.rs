use chrono::Utc;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set};

use crate::entity::bug::{self, BugStatus};
use crate::entity::bug_dependency;
use crate::model::global_error::AppError;

/// Every dependency edge as `(bug_id, depends_on_id)`.
pub async fn all_edges<C: ConnectionTrait>(conn: &C) -> Result<Vec<(i32, i32)>, AppError> {
    Ok(bug_dependency::Entity::find()
        .select_only()
        .column(bug_dependency::Column::BugId)
        .column(bug_dependency::Column::DependsOnId)
        .into_tuple::<(i32, i32)>()
        .all(conn)
        .await?)
}

pub async fn edge_exists<C: ConnectionTrait>(conn: &C, bug_id: i32, depends_on_id: i32) -> Result<bool, AppError> {
    Ok(bug_dependency::Entity::find_by_id((bug_id, depends_on_id))
        .one(conn)
        .await?
        .is_some())
}

pub async fn insert_edge<C: ConnectionTrait>(conn: &C, bug_id: i32, depends_on_id: i32) -> Result<(), AppError> {
    let edge = bug_dependency::ActiveModel {
        bug_id: Set(bug_id),
        depends_on_id: Set(depends_on_id),
        created_at: Set(Utc::now()),
    };
    bug_dependency::Entity::insert(edge).exec_without_returning(conn).await?;
    Ok(())
}

/// Returns true when an edge was removed.
pub async fn delete_edge<C: ConnectionTrait>(conn: &C, bug_id: i32, depends_on_id: i32) -> Result<bool, AppError> {
    let removed = bug_dependency::Entity::delete_by_id((bug_id, depends_on_id))
        .exec(conn)
        .await?
        .rows_affected;
    Ok(removed > 0)
}

/// Bugs that `bug_id` is blocked by.
pub async fn dependencies_of<C: ConnectionTrait>(conn: &C, bug_id: i32) -> Result<Vec<i32>, AppError> {
    Ok(bug_dependency::Entity::find()
        .select_only()
        .column(bug_dependency::Column::DependsOnId)
        .filter(bug_dependency::Column::BugId.eq(bug_id))
        .order_by_asc(bug_dependency::Column::DependsOnId)
        .into_tuple::<i32>()
        .all(conn)
        .await?)
}

/// Bugs blocked by `bug_id`.
pub async fn dependents_of<C: ConnectionTrait>(conn: &C, bug_id: i32) -> Result<Vec<i32>, AppError> {
    Ok(bug_dependency::Entity::find()
        .select_only()
        .column(bug_dependency::Column::BugId)
        .filter(bug_dependency::Column::DependsOnId.eq(bug_id))
        .order_by_asc(bug_dependency::Column::BugId)
        .into_tuple::<i32>()
        .all(conn)
        .await?)
}

/// Dependencies of `bug_id` that are neither resolved nor closed, sorted by id.
pub async fn unresolved_dependencies<C: ConnectionTrait>(conn: &C, bug_id: i32) -> Result<Vec<i32>, AppError> {
    let blockers = dependencies_of(conn, bug_id).await?;
    if blockers.is_empty() {
        return Ok(blockers);
    }

    let statuses = bug::Entity::find()
        .select_only()
        .column(bug::Column::Id)
        .column(bug::Column::Status)
        .filter(bug::Column::Id.is_in(blockers))
        .order_by_asc(bug::Column::Id)
        .into_tuple::<(i32, BugStatus)>()
        .all(conn)
        .await?;

    Ok(statuses
        .into_iter()
        .filter(|(_, status)| !status.is_settled())
        .map(|(id, _)| id)
        .collect())
}
