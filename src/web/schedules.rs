//! Schedule configuration CRUD and scheduler runtime endpoints.

use axum::extract::{Path, State};
use axum::response::Json;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::instrument;

use crate::data::models::ScheduleConfig;
use crate::data::schedules::{self, ScheduleDraft};
use crate::scheduler::{
    create_schedule, delete_schedule, describe_schedule, execute_now, toggle_schedule,
    update_schedule,
};
use crate::state::AppState;
use crate::web::error::{ApiError, db_error, success};

/// A configuration plus its derived schedule rendering.
#[derive(Debug, Serialize)]
pub struct ScheduleView {
    #[serde(flatten)]
    pub config: ScheduleConfig,
    pub schedule_display: String,
}

fn view(config: ScheduleConfig) -> ScheduleView {
    let schedule_display = describe_schedule(&config);
    ScheduleView {
        config,
        schedule_display,
    }
}

/// `GET /api/schedules`
pub async fn list(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let configs = schedules::list(&state.db_pool)
        .await
        .map_err(|e| db_error("Schedule listing", e))?;
    let views: Vec<ScheduleView> = configs.into_iter().map(view).collect();
    Ok(success(views))
}

/// `GET /api/schedules/{id}`
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    match schedules::get(&state.db_pool, id)
        .await
        .map_err(|e| db_error("Schedule lookup", e))?
    {
        Some(config) => Ok(success(view(config))),
        None => Err(ApiError::not_found("Schedule configuration not found")),
    }
}

/// `POST /api/schedules`
#[instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    Json(draft): Json<ScheduleDraft>,
) -> Result<Json<Value>, ApiError> {
    let config = create_schedule(&state.db_pool, &state.scheduler, draft).await?;
    Ok(success(view(config)))
}

/// `PUT /api/schedules/{id}`
#[instrument(skip_all, fields(config_id = id))]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(draft): Json<ScheduleDraft>,
) -> Result<Json<Value>, ApiError> {
    let config = update_schedule(&state.db_pool, &state.scheduler, id, draft).await?;
    Ok(success(view(config)))
}

/// `POST /api/schedules/{id}/toggle`
pub async fn toggle(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    let config = toggle_schedule(&state.db_pool, &state.scheduler, id).await?;
    Ok(success(view(config)))
}

/// `DELETE /api/schedules/{id}`
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    delete_schedule(&state.db_pool, &state.scheduler, id).await?;
    Ok(success(json!({ "deleted": id })))
}

/// `POST /api/schedules/{id}/execute` — run this configuration now, outside
/// its schedule.
#[instrument(skip_all, fields(config_id = id))]
pub async fn execute(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    let run = execute_now(&state.db_pool, &state.github, id).await?;
    Ok(success(run))
}

/// `GET /api/scheduler/status`
pub async fn scheduler_status(State(state): State<AppState>) -> Json<Value> {
    let status = state.scheduler.status().await;
    success(status)
}

/// `POST /api/scheduler/reload` — force a full reconciliation.
pub async fn scheduler_reload(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let jobs = state
        .scheduler
        .reconcile()
        .await
        .map_err(|e| db_error("Scheduler reload", e))?;
    Ok(success(json!({ "jobs": jobs })))
}
