use actix_web::{get, web, HttpResponse};
use tracing::error;

use crate::workflow::BugWorkflow;

#[utoipa::path(
    get,
    path = "/health-check",
    responses(
        (status = 200, description = "Service and database are reachable", body = String),
        (status = 503, description = "Database is unreachable", body = String),
    ),
    tag = "health check",
)]
#[get("/health-check")]
pub async fn health_check(workflow: web::Data<BugWorkflow>) -> HttpResponse {
    match workflow.db().ping().await {
        Ok(()) => HttpResponse::Ok().body("OK"),
        Err(err) => {
            error!(error = %err, "health check could not reach the database");
            HttpResponse::ServiceUnavailable().body("database unavailable")
        }
    }
}
