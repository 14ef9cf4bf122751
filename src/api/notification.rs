use actix_web::{get, put, web, HttpResponse};

use crate::model::auth::Actor;
use crate::model::global_error::{AppError, ErrorCode};
use crate::model::notification::NotificationResponse;
use crate::workflow::BugWorkflow;

#[utoipa::path(
    get,
    path = "/api/notifications",
    summary = "Notifications of the current user, newest first",
    responses(
        (status = 200, description = "Notifications", body = Vec<NotificationResponse>),
    ),
    tag = "notifications",
)]
#[get("/notifications")]
pub async fn list_notifications(
    workflow: web::Data<BugWorkflow>,
    actor: web::ReqData<Actor>,
) -> Result<HttpResponse, AppError> {
    let user_id = actor
        .user_id
        .ok_or_else(|| AppError::unauthorized(ErrorCode::AuthenticationFailed))?;

    let response: Vec<NotificationResponse> = workflow
        .list_notifications(user_id)
        .await?
        .into_iter()
        .map(NotificationResponse::from)
        .collect();

    Ok(HttpResponse::Ok().json(response))
}

#[utoipa::path(
    put,
    path = "/api/notifications/{id}/read",
    summary = "Mark a notification as read",
    params(("id", description = "Notification id", example = 1)),
    responses(
        (status = 200, description = "Notification marked read", body = NotificationResponse),
        (status = 403, description = "Notification belongs to someone else"),
        (status = 404, description = "Notification not found"),
    ),
    tag = "notifications",
)]
#[put("/notifications/{id}/read")]
pub async fn mark_read(
    workflow: web::Data<BugWorkflow>,
    path: web::Path<i32>,
    actor: web::ReqData<Actor>,
) -> Result<HttpResponse, AppError> {
    let updated = workflow
        .mark_notification_read(path.into_inner(), &actor)
        .await?;

    Ok(HttpResponse::Ok().json(NotificationResponse::from(updated)))
}
