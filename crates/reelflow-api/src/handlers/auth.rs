//! Login handler.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::password_matches;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
}

/// Exchange the dashboard password for a bearer token.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    if let Some(expected) = &state.config.dashboard_password {
        if !password_matches(expected, &request.password) {
            warn!("Rejected dashboard login");
            return Err(ApiError::unauthorized("Incorrect password"));
        }
    }

    let access_token = state.tokens.issue()?;
    info!("Dashboard login");

    Ok(Json(LoginResponse {
        access_token,
        token_type: "bearer",
        expires_in: state.tokens.ttl_secs(),
    }))
}
