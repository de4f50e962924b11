//! Refresh run records: creation, finalization, and reporting queries.

use crate::data::models::{RefreshRun, RunTrigger};
use anyhow::{Context, Result};
use serde::Serialize;
use sqlx::{PgExecutor, PgPool};

/// Insert a new run in `running` state and return its id.
///
/// Persisted before any fetching starts so concurrent observers can see
/// in-flight work.
pub async fn create(pool: &PgPool, trigger: RunTrigger, keyword: &str) -> Result<i32> {
    let id: i32 = sqlx::query_scalar(
        "INSERT INTO refresh_runs (trigger_kind, keyword, status) VALUES ($1, $2, 'running') RETURNING id",
    )
    .bind(trigger)
    .bind(keyword)
    .fetch_one(pool)
    .await
    .context("failed to create refresh run")?;
    Ok(id)
}

/// Mark a run successful, stamping end time and duration.
pub async fn finalize_success(pool: &PgPool, id: i32, api_requests: i32) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE refresh_runs SET
            status = 'success',
            api_requests = $2,
            ended_at = now(),
            duration_secs = EXTRACT(EPOCH FROM (now() - started_at))::int
        WHERE id = $1 AND status = 'running'
        "#,
    )
    .bind(id)
    .bind(api_requests)
    .execute(pool)
    .await
    .context("failed to finalize refresh run as success")?;
    Ok(())
}

/// Mark a run failed with a human-readable message.
pub async fn finalize_failure(pool: &PgPool, id: i32, api_requests: i32, message: &str) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE refresh_runs SET
            status = 'failed',
            api_requests = $2,
            error_message = $3,
            ended_at = now(),
            duration_secs = EXTRACT(EPOCH FROM (now() - started_at))::int
        WHERE id = $1 AND status = 'running'
        "#,
    )
    .bind(id)
    .bind(api_requests)
    .bind(message)
    .execute(pool)
    .await
    .context("failed to finalize refresh run as failure")?;
    Ok(())
}

/// Write the batch counters for a run. Takes any executor so the upsert
/// engine can call it inside its own transaction.
pub async fn set_batch_counts<'e>(
    executor: impl PgExecutor<'e>,
    id: i32,
    total_fetched: i32,
    new_projects: i32,
    updated_projects: i32,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE refresh_runs SET
            total_fetched = $2,
            new_projects = $3,
            updated_projects = $4
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(total_fetched)
    .bind(new_projects)
    .bind(updated_projects)
    .execute(executor)
    .await
    .context("failed to set refresh run counters")?;
    Ok(())
}

pub async fn get(pool: &PgPool, id: i32) -> Result<Option<RefreshRun>> {
    let row = sqlx::query_as::<_, RefreshRun>("SELECT * FROM refresh_runs WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch refresh run")?;
    Ok(row)
}

pub async fn list_recent(pool: &PgPool, limit: i64) -> Result<Vec<RefreshRun>> {
    let rows = sqlx::query_as::<_, RefreshRun>(
        "SELECT * FROM refresh_runs ORDER BY started_at DESC LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("failed to list refresh runs")?;
    Ok(rows)
}

/// Run counts over the trailing seven days, for the stats endpoint.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct WeekStats {
    pub recent_count: i64,
    pub successful_count: i64,
}

pub async fn week_stats(pool: &PgPool) -> Result<WeekStats> {
    let row = sqlx::query_as::<_, WeekStats>(
        r#"
        SELECT COUNT(*) AS recent_count,
               COUNT(*) FILTER (WHERE status = 'success') AS successful_count
        FROM refresh_runs
        WHERE started_at >= now() - interval '7 days'
        "#,
    )
    .fetch_one(pool)
    .await
    .context("failed to fetch weekly refresh stats")?;
    Ok(row)
}

/// Whether any scheduled run has started since UTC midnight. Used to decide
/// if the startup catch-up refresh is needed.
pub async fn any_scheduled_today(pool: &PgPool) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM refresh_runs
            WHERE trigger_kind = 'scheduled' AND started_at >= date_trunc('day', now())
        )
        "#,
    )
    .fetch_one(pool)
    .await
    .context("failed to check for scheduled runs today")?;
    Ok(exists)
}
