//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use reelflow_supervisor::{CatalogError, SupervisorError};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unprocessable(String),

    #[error("Supervisor unavailable")]
    Unavailable,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<SupervisorError> for ApiError {
    fn from(e: SupervisorError) -> Self {
        match e {
            SupervisorError::TaskNotFound(_) => Self::NotFound(e.to_string()),
            SupervisorError::Unavailable => Self::Unavailable,
            e if e.is_conflict() => Self::Conflict(e.to_string()),
            e if e.is_configuration_error() => Self::Unprocessable(e.to_string()),
            e => Self::Internal(e.to_string()),
        }
    }
}

impl From<CatalogError> for ApiError {
    fn from(e: CatalogError) -> Self {
        Self::Internal(e.to_string())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let detail = match &self {
            ApiError::Internal(msg) => {
                error!(error = %msg, "Request failed");
                // Don't expose internal error details in production
                if std::env::var("ENVIRONMENT").unwrap_or_default() == "production" {
                    "An internal error occurred".to_string()
                } else {
                    self.to_string()
                }
            }
            _ => self.to_string(),
        };

        (status, Json(ErrorResponse { detail })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_supervisor_error_status_mapping() {
        let cases = [
            (SupervisorError::TaskNotFound("Build".into()), StatusCode::NOT_FOUND),
            (SupervisorError::AlreadyRunning("Build".into()), StatusCode::CONFLICT),
            (
                SupervisorError::LogFileInUse {
                    task: "a b".into(),
                    path: PathBuf::from("a_b.log"),
                },
                StatusCode::CONFLICT,
            ),
            (SupervisorError::ScriptPathMissing("Build".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (
                SupervisorError::ScriptNotFound(PathBuf::from("/srv/missing.py")),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (SupervisorError::InterpreterNotFound("python3".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (
                SupervisorError::spawn("Build", std::io::Error::from(std::io::ErrorKind::PermissionDenied)),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                SupervisorError::Catalog(CatalogError::NotFound(PathBuf::from("controller.json"))),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (SupervisorError::Unavailable, StatusCode::SERVICE_UNAVAILABLE),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status_code(), status);
        }
    }

    #[test]
    fn test_not_found_detail_names_task() {
        let err = ApiError::from(SupervisorError::TaskNotFound("Build".into()));
        assert_eq!(err.to_string(), "Task 'Build' not found in controller tasks");
    }
}
