//! Monitor view and history maintenance.

use axum::extract::State;
use axum::Json;
use reelflow_models::MonitorView;
use serde::Serialize;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::state::AppState;

/// Running tasks and recent history, newest first.
pub async fn monitor(State(state): State<AppState>, _user: AuthUser) -> ApiResult<Json<MonitorView>> {
    Ok(Json(state.supervisor.monitor().await?))
}

#[derive(Debug, Serialize)]
pub struct ClearHistoryResponse {
    pub message: String,
    pub removed_files: usize,
    pub errors: Vec<String>,
}

/// Forget finished jobs and delete stray log files.
pub async fn clear_history(
    State(state): State<AppState>,
    _user: AuthUser,
) -> ApiResult<Json<ClearHistoryResponse>> {
    let report = state.supervisor.clear_history().await?;

    let message = if report.errors.is_empty() {
        "Finished job log cleared".to_string()
    } else {
        "Finished job log cleared with errors".to_string()
    };

    Ok(Json(ClearHistoryResponse {
        message,
        removed_files: report.removed_files,
        errors: report.errors,
    }))
}
