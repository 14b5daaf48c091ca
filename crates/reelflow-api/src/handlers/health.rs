//! Health check handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Liveness probe.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "healthy" })
}

/// Readiness check response.
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
    pub checks: ReadinessChecks,
}

#[derive(Serialize)]
pub struct ReadinessChecks {
    pub supervisor: CheckStatus,
    pub controller_file: CheckStatus,
}

#[derive(Serialize)]
pub struct CheckStatus {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CheckStatus {
    fn from_error(error: Option<String>) -> Self {
        Self {
            ok: error.is_none(),
            error,
        }
    }
}

/// Readiness probe: the supervisor accepts commands and the controller file parses.
pub async fn ready(
    State(state): State<AppState>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    let supervisor = CheckStatus::from_error(
        (!state.supervisor.is_running()).then(|| "supervisor stopped".to_string()),
    );
    let controller_file = CheckStatus::from_error(state.catalog.load().await.err().map(|e| e.to_string()));

    let all_ok = supervisor.ok && controller_file.ok;
    let response = ReadinessResponse {
        status: if all_ok { "ready" } else { "degraded" },
        checks: ReadinessChecks {
            supervisor,
            controller_file,
        },
    };

    if all_ok {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}
