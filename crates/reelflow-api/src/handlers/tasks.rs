//! Task catalog and run controls.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use reelflow_models::{DashboardModule, RunSnapshot};
use reelflow_supervisor::CancelOutcome;
use serde::Serialize;
use tracing::info;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::state::AppState;

/// One catalog entry as shown in the task list.
#[derive(Debug, Serialize)]
pub struct TaskSummary {
    pub name: String,
    pub script: Option<String>,
    pub args: Vec<String>,
    pub running: bool,
}

#[derive(Debug, Serialize)]
pub struct TaskListResponse {
    pub tasks: Vec<TaskSummary>,
}

/// List every task in the controller file.
pub async fn list_tasks(
    State(state): State<AppState>,
    _user: AuthUser,
) -> ApiResult<Json<TaskListResponse>> {
    let document = state.catalog.load().await?;
    let view = state.supervisor.monitor().await?;

    let tasks = document
        .tasks
        .iter()
        .map(|(name, descriptor)| TaskSummary {
            name: name.clone(),
            script: descriptor.script_path().map(str::to_string),
            args: descriptor.args.clone(),
            running: view.is_running(name),
        })
        .collect();

    Ok(Json(TaskListResponse { tasks }))
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub modules: Vec<DashboardModule>,
    pub running: Vec<String>,
}

/// Categories with their matching tasks, plus the names currently running.
pub async fn dashboard(
    State(state): State<AppState>,
    _user: AuthUser,
) -> ApiResult<Json<DashboardResponse>> {
    let document = state.catalog.load().await?;
    let view = state.supervisor.monitor().await?;

    Ok(Json(DashboardResponse {
        modules: document.dashboard_modules(),
        running: view.running.into_iter().map(|run| run.name).collect(),
    }))
}

#[derive(Debug, Serialize)]
pub struct RunResponse {
    pub message: String,
    pub run: RunSnapshot,
}

/// Start a task.
pub async fn run_task(
    State(state): State<AppState>,
    user: AuthUser,
    Path(name): Path<String>,
) -> ApiResult<(StatusCode, Json<RunResponse>)> {
    info!(task = %name, user = %user.subject, "Run requested");
    let run = state.supervisor.trigger(&name).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(RunResponse {
            message: format!("Task '{}' started", name),
            run,
        }),
    ))
}

#[derive(Debug, Serialize)]
pub struct StopResponse {
    pub message: String,
    pub stopped: bool,
    pub forced: bool,
}

/// Stop a running task. Stopping an idle task is not an error.
pub async fn stop_task(
    State(state): State<AppState>,
    user: AuthUser,
    Path(name): Path<String>,
) -> ApiResult<Json<StopResponse>> {
    info!(task = %name, user = %user.subject, "Stop requested");

    let response = match state.supervisor.cancel(&name).await? {
        CancelOutcome::Stopped { forced } => StopResponse {
            message: format!("Stop signal sent to '{}'", name),
            stopped: true,
            forced,
        },
        CancelOutcome::NotRunning => StopResponse {
            message: format!("Task '{}' not found or already finished", name),
            stopped: false,
            forced: false,
        },
    };

    Ok(Json(response))
}
