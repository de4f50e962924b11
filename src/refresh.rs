//! Refresh orchestration: one fetch+upsert cycle wrapped in a persisted,
//! status-tracked run record.

use crate::data::models::{RefreshRun, RunTrigger};
use crate::data::{projects, refresh_runs};
use crate::github::GithubApi;
use anyhow::{Context, Result, anyhow};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Execute one refresh run: fetch, upsert, and finalize the run record.
///
/// The run row is inserted (status `running`) before anything else so
/// in-flight work is observable, then finalized exactly once on every path:
/// at least one fetched item and a committed batch mean `success`; an empty
/// fetch or any error means `failed` with a recorded message.
#[tracing::instrument(skip(pool, github), fields(%keyword, ?trigger))]
pub async fn perform_refresh(
    pool: &PgPool,
    github: &GithubApi,
    trigger: RunTrigger,
    keyword: &str,
    max_results: usize,
) -> Result<RefreshRun> {
    let run_id = refresh_runs::create(pool, trigger, keyword).await?;
    info!(run_id, "refresh run started");

    let outcome = github.fetch_all(keyword, max_results).await;
    let api_requests = outcome.requests as i32;

    let result: Result<projects::BatchReport> = async {
        if outcome.items.is_empty() {
            return Err(anyhow!(
                "search returned no data for keyword `{keyword}`"
            ));
        }
        projects::save_batch(pool, &outcome.items, run_id).await
    }
    .await;

    match result {
        Ok(report) => {
            refresh_runs::finalize_success(pool, run_id, api_requests).await?;
            info!(
                run_id,
                fetched = report.total,
                new = report.new,
                updated = report.updated,
                failed = report.failed,
                "refresh run succeeded"
            );
        }
        Err(e) => {
            let message = format!("{e:#}");
            error!(run_id, error = %message, "refresh run failed");
            refresh_runs::finalize_failure(pool, run_id, api_requests, &message).await?;
        }
    }

    refresh_runs::get(pool, run_id)
        .await?
        .context("refresh run vanished during finalization")
}

/// One-shot startup catch-up: if no scheduled run has started today, perform
/// one with the default keyword. Spawned in the background at boot.
pub async fn run_startup_catchup(
    pool: PgPool,
    github: Arc<GithubApi>,
    keyword: String,
    max_results: usize,
) {
    match refresh_runs::any_scheduled_today(&pool).await {
        Ok(true) => info!("scheduled refresh already ran today, skipping startup catch-up"),
        Ok(false) => {
            info!(keyword, "no scheduled run today, performing startup refresh");
            if let Err(e) = perform_refresh(
                &pool,
                &github,
                RunTrigger::Scheduled,
                &keyword,
                max_results,
            )
            .await
            {
                error!(error = ?e, "startup refresh failed");
            }
        }
        Err(e) => warn!(error = ?e, "could not check for today's scheduled runs"),
    }
}
