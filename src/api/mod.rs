mod bug;
mod health;
mod notification;

use actix_web::web;
use utoipa::OpenApi;

use crate::model::bug::{
    ActivityResponse, BugAssigneeRequest, BugDetailResponse, BugResponse, BugStatusRequest,
    DependencyRequest, NewBug, TimeLogRequest, TimeTrackingResponse,
};
use crate::model::notification::NotificationResponse;

pub use bug::{
    add_dependency, assign_worker, bug_activity, change_status, create_bug, get_bug, log_time,
    project_activity, remove_dependency,
};
pub use health::health_check;
pub use notification::{list_notifications, mark_read};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        bug::create_bug,
        bug::get_bug,
        bug::change_status,
        bug::assign_worker,
        bug::add_dependency,
        bug::remove_dependency,
        bug::log_time,
        bug::bug_activity,
        bug::project_activity,
        notification::list_notifications,
        notification::mark_read,
    ),
    components(schemas(
        NewBug,
        BugStatusRequest,
        BugAssigneeRequest,
        DependencyRequest,
        TimeLogRequest,
        BugResponse,
        BugDetailResponse,
        TimeTrackingResponse,
        ActivityResponse,
        NotificationResponse,
    ))
)]
pub struct ApiDoc;

/// Routes served under `/api`; the caller wraps them in the auth middleware.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(create_bug)
        .service(get_bug)
        .service(change_status)
        .service(assign_worker)
        .service(add_dependency)
        .service(remove_dependency)
        .service(log_time)
        .service(bug_activity)
        .service(project_activity)
        .service(list_notifications)
        .service(mark_read);
}
