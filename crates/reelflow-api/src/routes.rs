//! API routes.

use axum::middleware;
use axum::routing::{delete, get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::{
    clear_history, dashboard, get_category_links, get_category_settings, get_global_settings,
    health, list_tasks, login, monitor, ready, run_task, settings_overview, stop_task,
    stream_task_log, update_category_links, update_category_settings, update_global_settings,
};
use crate::metrics::metrics_middleware;
use crate::middleware::{cors_layer, request_id, request_logging, security_headers};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let task_routes = Router::new()
        .route("/tasks", get(list_tasks))
        .route("/dashboard", get(dashboard))
        .route("/tasks/:name/run", post(run_task))
        .route("/tasks/:name/stop", post(stop_task))
        .route("/tasks/:name/stream", get(stream_task_log));

    let monitor_routes = Router::new()
        .route("/monitor", get(monitor))
        .route("/history", delete(clear_history));

    let settings_routes = Router::new()
        .route("/settings", get(settings_overview))
        .route(
            "/settings/global",
            get(get_global_settings).put(update_global_settings),
        )
        .route(
            "/settings/categories/:name",
            get(get_category_settings).put(update_category_settings),
        )
        .route(
            "/categories/:name/links",
            get(get_category_links).put(update_category_links),
        );

    let api_routes = Router::new()
        .route("/login", post(login))
        .merge(task_routes)
        .merge(monitor_routes)
        .merge(settings_routes)
        .route_layer(middleware::from_fn(metrics_middleware));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/ready", get(ready));

    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
