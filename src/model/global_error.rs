use actix_web::{HttpResponse, ResponseError};
use sea_orm::DbErr;
use serde::Serialize;
use thiserror::Error;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // 400 BAD REQUEST
    ValidationError,
    InvalidStatus,
    InvalidSprint,
    InvalidDuration,
    SelfDependency,

    // 401 UNAUTHORIZED
    AuthenticationFailed,
    ExpiredAuthToken,
    InvalidAuthToken,

    // 403 FORBIDDEN
    NotEnoughPermission,

    // 404 NOT FOUND
    BugNotFound,
    ProjectNotFound,
    WorkspaceNotFound,
    TeamNotFound,
    WorkerNotFound,
    SprintNotFound,
    UserNotFound,
    NotificationNotFound,

    // 409 CONFLICT
    InvalidTransition,
    UnresolvedDependency,
    CyclicDependency,
    ConcurrencyConflict,

    // 500 SERVER ERRORS
    DatabaseError,
    InternalError,
}

impl ErrorCode {
    pub fn message(&self) -> &'static str {
        match self {
            ErrorCode::ValidationError => "Validation failed",
            ErrorCode::InvalidStatus => "Unknown bug status",
            ErrorCode::InvalidSprint => "Sprint does not belong to the bug's project",
            ErrorCode::InvalidDuration => "Logged time must not be negative",
            ErrorCode::SelfDependency => "A bug cannot depend on itself",

            ErrorCode::AuthenticationFailed => "Authentication failed",
            ErrorCode::ExpiredAuthToken => "Auth token has expired",
            ErrorCode::InvalidAuthToken => "Invalid auth token",

            ErrorCode::NotEnoughPermission => "Not enough permission",

            ErrorCode::BugNotFound => "Bug not found",
            ErrorCode::ProjectNotFound => "Project not found",
            ErrorCode::WorkspaceNotFound => "Workspace not found",
            ErrorCode::TeamNotFound => "Team not found",
            ErrorCode::WorkerNotFound => "Worker not found",
            ErrorCode::SprintNotFound => "Sprint not found",
            ErrorCode::UserNotFound => "User not found",
            ErrorCode::NotificationNotFound => "Notification not found",

            ErrorCode::InvalidTransition => "Status transition is not allowed",
            ErrorCode::UnresolvedDependency => "Bug is blocked by unresolved dependencies",
            ErrorCode::CyclicDependency => "Dependency would create a cycle",
            ErrorCode::ConcurrencyConflict => "Bug is busy, retry the request",

            ErrorCode::DatabaseError => "A database error occurred",
            ErrorCode::InternalError => "Internal server error",
        }
    }

    pub fn status_code(&self) -> actix_web::http::StatusCode {
        use actix_web::http::StatusCode;

        match self {
            ErrorCode::ValidationError |
            ErrorCode::InvalidStatus |
            ErrorCode::InvalidSprint |
            ErrorCode::InvalidDuration |
            ErrorCode::SelfDependency => StatusCode::BAD_REQUEST,

            ErrorCode::AuthenticationFailed |
            ErrorCode::ExpiredAuthToken |
            ErrorCode::InvalidAuthToken => StatusCode::UNAUTHORIZED,

            ErrorCode::NotEnoughPermission => StatusCode::FORBIDDEN,

            ErrorCode::BugNotFound |
            ErrorCode::ProjectNotFound |
            ErrorCode::WorkspaceNotFound |
            ErrorCode::TeamNotFound |
            ErrorCode::WorkerNotFound |
            ErrorCode::SprintNotFound |
            ErrorCode::UserNotFound |
            ErrorCode::NotificationNotFound => StatusCode::NOT_FOUND,

            ErrorCode::InvalidTransition |
            ErrorCode::UnresolvedDependency |
            ErrorCode::CyclicDependency |
            ErrorCode::ConcurrencyConflict => StatusCode::CONFLICT,

            ErrorCode::DatabaseError |
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    ApiError(ErrorCode, Option<String>),

    #[error("{} (blocked by {:?})", ErrorCode::UnresolvedDependency, .0)]
    UnresolvedDependency(Vec<i32>),

    #[error("{}: {}", ErrorCode::DatabaseError, .0)]
    Database(#[from] DbErr),
}

impl AppError {
    pub fn new(code: ErrorCode) -> Self {
        AppError::ApiError(code, None)
    }

    pub fn with_detail(code: ErrorCode, detail: impl Into<String>) -> Self {
        AppError::ApiError(code, Some(detail.into()))
    }

    pub fn bad_request(code: ErrorCode) -> Self {
        Self::new(code)
    }

    pub fn unauthorized(code: ErrorCode) -> Self {
        Self::new(code)
    }

    pub fn forbidden(code: ErrorCode) -> Self {
        Self::new(code)
    }

    pub fn not_found(code: ErrorCode) -> Self {
        Self::new(code)
    }

    pub fn conflict(code: ErrorCode) -> Self {
        Self::new(code)
    }

    pub fn internal_error(code: ErrorCode) -> Self {
        Self::new(code)
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::ApiError(code, _) => *code,
            AppError::UnresolvedDependency(_) => ErrorCode::UnresolvedDependency,
            AppError::Database(_) => ErrorCode::DatabaseError,
        }
    }

    /// Ids of the bugs still blocking a resolution attempt.
    pub fn blocking_ids(&self) -> &[i32] {
        match self {
            AppError::UnresolvedDependency(ids) => ids,
            _ => &[],
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorResponse {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    blocking_bug_ids: Vec<i32>,
}

impl ResponseError for AppError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        self.code().status_code()
    }

    fn error_response(&self) -> HttpResponse {
        let code = self.code();
        let detail = match self {
            AppError::ApiError(_, detail) => detail.clone(),
            AppError::UnresolvedDependency(_) => None,
            AppError::Database(err) => {
                tracing::error!("database error: {}", err);
                None
            }
        };

        let response = ErrorResponse {
            code: format!("{:?}", code),
            message: code.message().to_string(),
            detail,
            blocking_bug_ids: self.blocking_ids().to_vec(),
        };

        HttpResponse::build(code.status_code())
            .json(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;

    #[test]
    fn unresolved_dependency_maps_to_conflict_with_ids() {
        let err = AppError::UnresolvedDependency(vec![3, 7]);
        assert_eq!(err.code(), ErrorCode::UnresolvedDependency);
        assert_eq!(err.blocking_ids(), &[3, 7]);
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert!(err.to_string().contains("[3, 7]"));
    }

    #[test]
    fn db_errors_become_database_error() {
        let err: AppError = DbErr::Custom("boom".into()).into();
        assert_eq!(err.code(), ErrorCode::DatabaseError);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn self_dependency_is_a_bad_request() {
        let err = AppError::bad_request(ErrorCode::SelfDependency);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
