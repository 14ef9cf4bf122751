use std::str::FromStr;

use actix_web::{delete, get, post, put, web, HttpResponse};

use crate::entity::bug::BugStatus;
use crate::model::auth::Actor;
use crate::model::bug::{
    ActivityResponse, BugAssigneeRequest, BugDetailResponse, BugResponse, BugStatusRequest,
    DependencyRequest, NewBug, TimeLogRequest, TimeTrackingResponse,
};
use crate::model::global_error::{AppError, ErrorCode};
use crate::store::ActivityScope;
use crate::workflow::BugWorkflow;

#[utoipa::path(
    post,
    path = "/api/projects/{id}/bugs",
    summary = "Report a bug",
    params(("id", description = "Project id", example = 1)),
    request_body = NewBug,
    responses(
        (status = 201, description = "Bug created", body = BugResponse),
        (status = 404, description = "Project, team, worker or sprint not found"),
    ),
    tag = "bugs",
)]
#[post("/projects/{id}/bugs")]
pub async fn create_bug(
    workflow: web::Data<BugWorkflow>,
    path: web::Path<i32>,
    body: web::Json<NewBug>,
    actor: web::ReqData<Actor>,
) -> Result<HttpResponse, AppError> {
    let created = workflow
        .create_bug(path.into_inner(), body.into_inner(), &actor)
        .await?;

    Ok(HttpResponse::Created().json(BugResponse::from(created)))
}

#[utoipa::path(
    get,
    path = "/api/bugs/{id}",
    summary = "Bug details with tags and dependencies",
    params(("id", description = "Bug id", example = 1)),
    responses(
        (status = 200, description = "Bug found", body = BugDetailResponse),
        (status = 404, description = "Bug not found"),
    ),
    tag = "bugs",
)]
#[get("/bugs/{id}")]
pub async fn get_bug(
    workflow: web::Data<BugWorkflow>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let bug_id = path.into_inner();
    let bug = workflow.get_bug(bug_id).await?;

    let response = BugDetailResponse {
        bug: BugResponse::from(bug),
        tags: workflow.bug_tags(bug_id).await?,
        depends_on: workflow.list_dependencies(bug_id).await?,
        blocks: workflow.list_dependents(bug_id).await?,
    };

    Ok(HttpResponse::Ok().json(response))
}

#[utoipa::path(
    put,
    path = "/api/bugs/{id}/status",
    summary = "Change bug status",
    params(("id", description = "Bug id", example = 1)),
    request_body = BugStatusRequest,
    responses(
        (status = 200, description = "Status changed (or already in that status)", body = BugResponse),
        (status = 400, description = "Unknown status"),
        (status = 403, description = "Role may not perform this transition"),
        (status = 409, description = "Transition not allowed or blocked by dependencies"),
    ),
    tag = "bugs",
)]
#[put("/bugs/{id}/status")]
pub async fn change_status(
    workflow: web::Data<BugWorkflow>,
    path: web::Path<i32>,
    body: web::Json<BugStatusRequest>,
    actor: web::ReqData<Actor>,
) -> Result<HttpResponse, AppError> {
    let target = BugStatus::from_str(body.status.trim())?;
    let updated = workflow.transition_bug(path.into_inner(), target, &actor).await?;

    Ok(HttpResponse::Ok().json(BugResponse::from(updated)))
}

#[utoipa::path(
    put,
    path = "/api/bugs/{id}/assignee",
    summary = "Assign or unassign a worker",
    params(("id", description = "Bug id", example = 1)),
    request_body = BugAssigneeRequest,
    responses(
        (status = 200, description = "Assignee updated", body = BugResponse),
        (status = 404, description = "Bug or worker not found"),
    ),
    tag = "bugs",
)]
#[put("/bugs/{id}/assignee")]
pub async fn assign_worker(
    workflow: web::Data<BugWorkflow>,
    path: web::Path<i32>,
    body: web::Json<BugAssigneeRequest>,
    actor: web::ReqData<Actor>,
) -> Result<HttpResponse, AppError> {
    let updated = workflow
        .assign_worker(path.into_inner(), body.worker_id, &actor)
        .await?;

    Ok(HttpResponse::Ok().json(BugResponse::from(updated)))
}

#[utoipa::path(
    post,
    path = "/api/bugs/{id}/dependencies",
    summary = "Mark the bug as blocked by another bug",
    params(("id", description = "Bug id", example = 1)),
    request_body = DependencyRequest,
    responses(
        (status = 204, description = "Dependency stored"),
        (status = 400, description = "A bug cannot depend on itself"),
        (status = 409, description = "Dependency would create a cycle"),
    ),
    tag = "dependencies",
)]
#[post("/bugs/{id}/dependencies")]
pub async fn add_dependency(
    workflow: web::Data<BugWorkflow>,
    path: web::Path<i32>,
    body: web::Json<DependencyRequest>,
    actor: web::ReqData<Actor>,
) -> Result<HttpResponse, AppError> {
    workflow
        .add_dependency(path.into_inner(), body.depends_on_id, &actor)
        .await?;

    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    delete,
    path = "/api/bugs/{id}/dependencies/{other}",
    summary = "Remove a dependency",
    params(
        ("id", description = "Bug id", example = 1),
        ("other", description = "Id of the blocking bug", example = 2),
    ),
    responses(
        (status = 204, description = "Dependency removed or was not present"),
    ),
    tag = "dependencies",
)]
#[delete("/bugs/{id}/dependencies/{other}")]
pub async fn remove_dependency(
    workflow: web::Data<BugWorkflow>,
    path: web::Path<(i32, i32)>,
    actor: web::ReqData<Actor>,
) -> Result<HttpResponse, AppError> {
    let (bug_id, depends_on_id) = path.into_inner();
    workflow.remove_dependency(bug_id, depends_on_id, &actor).await?;

    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    post,
    path = "/api/bugs/{id}/time",
    summary = "Log time spent on a bug",
    params(("id", description = "Bug id", example = 1)),
    request_body = TimeLogRequest,
    responses(
        (status = 200, description = "Running total for the worker", body = TimeTrackingResponse),
        (status = 400, description = "Negative or out-of-range duration"),
    ),
    tag = "bugs",
)]
#[post("/bugs/{id}/time")]
pub async fn log_time(
    workflow: web::Data<BugWorkflow>,
    path: web::Path<i32>,
    body: web::Json<TimeLogRequest>,
    actor: web::ReqData<Actor>,
) -> Result<HttpResponse, AppError> {
    let spent = chrono::Duration::try_seconds(body.seconds).ok_or_else(|| {
        AppError::with_detail(ErrorCode::InvalidDuration, format!("{} seconds is out of range", body.seconds))
    })?;
    let entry = workflow
        .log_time(path.into_inner(), body.worker_id, spent, &actor)
        .await?;

    Ok(HttpResponse::Ok().json(TimeTrackingResponse::from(entry)))
}

#[utoipa::path(
    get,
    path = "/api/bugs/{id}/activity",
    summary = "Activity of a bug, newest first",
    params(("id", description = "Bug id", example = 1)),
    responses(
        (status = 200, description = "Activity entries", body = Vec<ActivityResponse>),
    ),
    tag = "activity",
)]
#[get("/bugs/{id}/activity")]
pub async fn bug_activity(
    workflow: web::Data<BugWorkflow>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let entries = workflow
        .list_activity(ActivityScope::Bug(path.into_inner()))
        .await?;

    let response: Vec<ActivityResponse> = entries.into_iter().map(ActivityResponse::from).collect();
    Ok(HttpResponse::Ok().json(response))
}

#[utoipa::path(
    get,
    path = "/api/projects/{id}/activity",
    summary = "Activity of a project, newest first",
    params(("id", description = "Project id", example = 1)),
    responses(
        (status = 200, description = "Activity entries", body = Vec<ActivityResponse>),
    ),
    tag = "activity",
)]
#[get("/projects/{id}/activity")]
pub async fn project_activity(
    workflow: web::Data<BugWorkflow>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let entries = workflow
        .list_activity(ActivityScope::Project(path.into_inner()))
        .await?;

    let response: Vec<ActivityResponse> = entries.into_iter().map(ActivityResponse::from).collect();
    Ok(HttpResponse::Ok().json(response))
}
