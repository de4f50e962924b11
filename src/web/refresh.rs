//! Manual refresh trigger and run inspection endpoints.

use axum::extract::{Path, Query, State};
use axum::response::Json;
use serde::Deserialize;
use serde_json::Value;
use tracing::instrument;

use crate::data::models::RunTrigger;
use crate::data::refresh_runs;
use crate::refresh::perform_refresh;
use crate::state::AppState;
use crate::web::error::{ApiError, db_error, success};

#[derive(Debug, Default, Deserialize)]
pub struct RefreshRequest {
    pub keyword: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RunListParams {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    20
}

/// `POST /api/refresh` — run a manual refresh synchronously and return the
/// finished run record.
#[instrument(skip_all)]
pub async fn trigger_refresh(
    State(state): State<AppState>,
    body: Option<Json<RefreshRequest>>,
) -> Result<Json<Value>, ApiError> {
    let keyword = body
        .and_then(|Json(request)| request.keyword)
        .filter(|k| !k.trim().is_empty())
        .unwrap_or_else(|| state.defaults.keyword.clone());

    let run = perform_refresh(
        &state.db_pool,
        &state.github,
        RunTrigger::Manual,
        &keyword,
        state.defaults.max_results,
    )
    .await
    .map_err(|e| db_error("Manual refresh", e))?;

    Ok(success(run))
}

/// `GET /api/refresh/runs`
pub async fn list_runs(
    State(state): State<AppState>,
    Query(params): Query<RunListParams>,
) -> Result<Json<Value>, ApiError> {
    let limit = params.limit.clamp(1, 100);
    let runs = refresh_runs::list_recent(&state.db_pool, limit)
        .await
        .map_err(|e| db_error("Run listing", e))?;
    Ok(success(runs))
}

/// `GET /api/refresh/runs/{id}`
pub async fn get_run(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    match refresh_runs::get(&state.db_pool, id)
        .await
        .map_err(|e| db_error("Run lookup", e))?
    {
        Some(run) => Ok(success(run)),
        None => Err(ApiError::not_found("Refresh run not found")),
    }
}
