//! Router construction.

use axum::{
    Router,
    routing::{get, post},
};
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer, timeout::TimeoutLayer, trace::TraceLayer,
};

use crate::state::AppState;
use crate::web::{projects, refresh, schedules, status};

/// Build the full API router.
pub fn create_router(app_state: AppState) -> Router {
    let api_router = Router::new()
        .route("/health", get(status::health))
        .route("/projects", get(projects::list_projects))
        .route("/projects/{id}", get(projects::get_project))
        .route("/languages", get(projects::list_languages))
        .route("/stats", get(projects::stats))
        .route("/refresh", post(refresh::trigger_refresh))
        .route("/refresh/runs", get(refresh::list_runs))
        .route("/refresh/runs/{id}", get(refresh::get_run))
        .route("/schedules", get(schedules::list).post(schedules::create))
        .route(
            "/schedules/{id}",
            get(schedules::get)
                .put(schedules::update)
                .delete(schedules::delete),
        )
        .route("/schedules/{id}/toggle", post(schedules::toggle))
        .route("/schedules/{id}/execute", post(schedules::execute))
        .route("/scheduler/status", get(schedules::scheduler_status))
        .route("/scheduler/reload", post(schedules::scheduler_reload))
        .with_state(app_state);

    Router::new().nest("/api", api_router).layer((
        TraceLayer::new_for_http(),
        CompressionLayer::new(),
        // Manual refreshes are synchronous and page through a rate-limited
        // upstream; give them room before the server gives up.
        TimeoutLayer::new(Duration::from_secs(300)),
    ))
}
