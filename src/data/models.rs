//! Row types shared across the data layer.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

/// What caused a refresh run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum RunTrigger {
    Manual,
    Scheduled,
}

/// Terminal state machine for a refresh run: running -> success | failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Success,
    Failed,
}

/// Schedule flavor; exactly one group of kind-specific columns is populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ScheduleKind {
    Interval,
    Cron,
}

/// A tracked repository snapshot, unique per (name, owner).
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Project {
    pub id: i32,
    pub name: String,
    pub full_name: String,
    pub owner: String,
    pub description: Option<String>,
    pub html_url: String,
    pub stars_count: i32,
    pub forks_count: i32,
    pub watchers_count: i32,
    pub open_issues_count: i32,
    pub size_kb: i32,
    pub language: Option<String>,
    pub topics: Json<Vec<String>>,
    pub license_name: Option<String>,
    pub default_branch: String,
    pub is_private: bool,
    pub is_fork: bool,
    pub archived: bool,
    pub disabled: bool,
    pub visibility: String,
    pub has_issues: bool,
    pub has_projects: bool,
    pub has_wiki: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub pushed_at: Option<DateTime<Utc>>,
    pub first_seen_at: DateTime<Utc>,
    pub last_fetched_at: DateTime<Utc>,
    pub fetch_count: i32,
}

/// One execution of the fetch+upsert pipeline.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RefreshRun {
    pub id: i32,
    pub trigger_kind: RunTrigger,
    pub keyword: String,
    pub status: RunStatus,
    pub total_fetched: i32,
    pub new_projects: i32,
    pub updated_projects: i32,
    pub api_requests: i32,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_secs: Option<i32>,
    pub error_message: Option<String>,
}

/// A named, operator-managed recurring refresh definition.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ScheduleConfig {
    pub id: i32,
    pub name: String,
    pub schedule_kind: ScheduleKind,
    pub interval_hours: Option<i32>,
    pub cron_hour: Option<i32>,
    pub cron_minute: Option<i32>,
    /// "*" for any day, or a comma list of 0-6 where 0 is Monday.
    pub cron_days: Option<String>,
    pub keyword: String,
    pub max_results: i32,
    pub is_active: bool,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_executed_at: Option<DateTime<Utc>>,
}

/// Per-calendar-day request counters against the upstream API.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ApiUsageStat {
    pub day: NaiveDate,
    pub total_requests: i32,
    pub successful_requests: i32,
    pub failed_requests: i32,
    pub rate_limit_hits: i32,
    pub updated_at: DateTime<Utc>,
}
