//! Schedule configuration storage.
//!
//! Validation lives in [`crate::scheduler`]; this module only moves rows.

use crate::data::models::{ScheduleConfig, ScheduleKind};
use anyhow::{Context, Result};
use serde::Deserialize;
use sqlx::PgPool;

/// Incoming create/update payload for a schedule configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleDraft {
    pub name: String,
    pub schedule_kind: ScheduleKind,
    pub interval_hours: Option<i32>,
    pub cron_hour: Option<i32>,
    pub cron_minute: Option<i32>,
    pub cron_days: Option<String>,
    #[serde(default = "default_keyword")]
    pub keyword: String,
    #[serde(default = "default_max_results")]
    pub max_results: i32,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub description: Option<String>,
}

fn default_keyword() -> String {
    "AI".to_string()
}

fn default_max_results() -> i32 {
    1000
}

fn default_active() -> bool {
    true
}

pub async fn insert(pool: &PgPool, draft: &ScheduleDraft) -> Result<ScheduleConfig> {
    let row = sqlx::query_as::<_, ScheduleConfig>(
        r#"
        INSERT INTO schedule_configs (
            name, schedule_kind, interval_hours, cron_hour, cron_minute, cron_days,
            keyword, max_results, is_active, description
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING *
        "#,
    )
    .bind(&draft.name)
    .bind(draft.schedule_kind)
    .bind(draft.interval_hours)
    .bind(draft.cron_hour)
    .bind(draft.cron_minute)
    .bind(&draft.cron_days)
    .bind(&draft.keyword)
    .bind(draft.max_results)
    .bind(draft.is_active)
    .bind(&draft.description)
    .fetch_one(pool)
    .await
    .context("failed to insert schedule configuration")?;
    Ok(row)
}

/// Overwrite a configuration. All kind-specific columns are rebound, so a
/// kind change clears the stale group in the same statement.
pub async fn update(pool: &PgPool, id: i32, draft: &ScheduleDraft) -> Result<Option<ScheduleConfig>> {
    let row = sqlx::query_as::<_, ScheduleConfig>(
        r#"
        UPDATE schedule_configs SET
            name = $2,
            schedule_kind = $3,
            interval_hours = $4,
            cron_hour = $5,
            cron_minute = $6,
            cron_days = $7,
            keyword = $8,
            max_results = $9,
            is_active = $10,
            description = $11,
            updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&draft.name)
    .bind(draft.schedule_kind)
    .bind(draft.interval_hours)
    .bind(draft.cron_hour)
    .bind(draft.cron_minute)
    .bind(&draft.cron_days)
    .bind(&draft.keyword)
    .bind(draft.max_results)
    .bind(draft.is_active)
    .bind(&draft.description)
    .fetch_optional(pool)
    .await
    .context("failed to update schedule configuration")?;
    Ok(row)
}

pub async fn toggle(pool: &PgPool, id: i32) -> Result<Option<ScheduleConfig>> {
    let row = sqlx::query_as::<_, ScheduleConfig>(
        "UPDATE schedule_configs SET is_active = NOT is_active, updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("failed to toggle schedule configuration")?;
    Ok(row)
}

pub async fn delete(pool: &PgPool, id: i32) -> Result<bool> {
    let result = sqlx::query("DELETE FROM schedule_configs WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .context("failed to delete schedule configuration")?;
    Ok(result.rows_affected() > 0)
}

pub async fn get(pool: &PgPool, id: i32) -> Result<Option<ScheduleConfig>> {
    let row = sqlx::query_as::<_, ScheduleConfig>("SELECT * FROM schedule_configs WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch schedule configuration")?;
    Ok(row)
}

pub async fn list(pool: &PgPool) -> Result<Vec<ScheduleConfig>> {
    let rows = sqlx::query_as::<_, ScheduleConfig>("SELECT * FROM schedule_configs ORDER BY id")
        .fetch_all(pool)
        .await
        .context("failed to list schedule configurations")?;
    Ok(rows)
}

/// All configurations the scheduler runtime should materialize.
pub async fn list_active(pool: &PgPool) -> Result<Vec<ScheduleConfig>> {
    let rows = sqlx::query_as::<_, ScheduleConfig>(
        "SELECT * FROM schedule_configs WHERE is_active ORDER BY id",
    )
    .fetch_all(pool)
    .await
    .context("failed to list active schedule configurations")?;
    Ok(rows)
}

pub async fn count(pool: &PgPool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schedule_configs")
        .fetch_one(pool)
        .await
        .context("failed to count schedule configurations")?;
    Ok(count)
}

pub async fn touch_last_executed(pool: &PgPool, id: i32) -> Result<()> {
    sqlx::query("UPDATE schedule_configs SET last_executed_at = now() WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .context("failed to stamp schedule execution time")?;
    Ok(())
}
