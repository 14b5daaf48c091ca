//! Axum HTTP/SSE API server.
//!
//! This crate provides:
//! - Task catalog and dashboard views
//! - Controller settings and category link editing
//! - Run / stop controls backed by the supervisor
//! - Server-sent log streaming for running tasks
//! - Password login with HS256 bearer tokens
//! - Health, readiness and Prometheus endpoints

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
