//! Project browsing and aggregate endpoints.

use axum::extract::{Path, Query, State};
use axum::response::Json;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use crate::data::{api_stats, projects, refresh_runs};
use crate::state::AppState;
use crate::web::error::{ApiError, db_error, success};

const MAX_PER_PAGE: u32 = 100;

#[derive(Debug, Deserialize)]
pub struct ProjectListParams {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    pub keyword: Option<String>,
    pub owner: Option<String>,
    pub language: Option<String>,
    #[serde(default = "default_sort")]
    pub sort: String,
    #[serde(default = "default_order")]
    pub order: String,
}

fn default_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    20
}

fn default_sort() -> String {
    "stars".to_string()
}

fn default_order() -> String {
    "desc".to_string()
}

/// `GET /api/projects` — paginated, filtered project listing.
#[instrument(skip_all, fields(page = params.page, sort = %params.sort))]
pub async fn list_projects(
    State(state): State<AppState>,
    Query(params): Query<ProjectListParams>,
) -> Result<Json<Value>, ApiError> {
    if projects::sort_column(&params.sort).is_none() {
        return Err(ApiError::bad_request(format!(
            "Invalid sort '{}'. Valid: stars, updated, name",
            params.sort
        )));
    }
    if projects::sort_direction(&params.order).is_none() {
        return Err(ApiError::bad_request(format!(
            "Invalid order '{}'. Valid: asc, desc",
            params.order
        )));
    }

    let page = params.page.max(1);
    let per_page = params.per_page.clamp(1, MAX_PER_PAGE);
    let filter = projects::ProjectFilter {
        keyword: non_empty(params.keyword.as_deref()),
        owner: non_empty(params.owner.as_deref()),
        language: non_empty(params.language.as_deref()),
    };

    let (rows, total) = projects::search(
        &state.db_pool,
        &filter,
        &params.sort,
        &params.order,
        page,
        per_page,
    )
    .await
    .map_err(|e| db_error("Project search", e))?;

    let pages = (total as u64).div_ceil(per_page as u64);
    Ok(success(json!({
        "projects": rows,
        "pagination": {
            "page": page,
            "per_page": per_page,
            "total": total,
            "pages": pages,
            "has_prev": page > 1,
            "has_next": (page as u64) < pages,
        }
    })))
}

/// `GET /api/projects/{id}`
pub async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    match projects::get(&state.db_pool, id)
        .await
        .map_err(|e| db_error("Project lookup", e))?
    {
        Some(project) => Ok(success(project)),
        None => Err(ApiError::not_found("Project not found")),
    }
}

/// `GET /api/languages` — every language with a project count.
pub async fn list_languages(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let languages = projects::language_counts(&state.db_pool)
        .await
        .map_err(|e| db_error("Language listing", e))?;
    Ok(success(languages))
}

/// `GET /api/stats` — project totals, top languages, recent refresh and API
/// usage summaries.
pub async fn stats(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let totals = projects::totals(&state.db_pool)
        .await
        .map_err(|e| db_error("Project totals", e))?;
    let languages = projects::top_languages(&state.db_pool, 10)
        .await
        .map_err(|e| db_error("Language stats", e))?;
    let refreshes = refresh_runs::week_stats(&state.db_pool)
        .await
        .map_err(|e| db_error("Refresh stats", e))?;
    let api_usage = api_stats::list_recent(&state.db_pool, 7)
        .await
        .map_err(|e| db_error("API usage stats", e))?;

    let success_rate = if refreshes.recent_count > 0 {
        let rate = refreshes.successful_count as f64 / refreshes.recent_count as f64 * 100.0;
        (rate * 100.0).round() / 100.0
    } else {
        0.0
    };

    Ok(success(json!({
        "projects": totals,
        "languages": languages,
        "refreshes": {
            "recent_count": refreshes.recent_count,
            "successful_count": refreshes.successful_count,
            "success_rate": success_rate,
        },
        "api_usage": api_usage,
    })))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_filters_are_dropped() {
        assert_eq!(non_empty(Some("")), None);
        assert_eq!(non_empty(Some("   ")), None);
        assert_eq!(non_empty(Some("rust")), Some("rust"));
        assert_eq!(non_empty(None), None);
    }
}
