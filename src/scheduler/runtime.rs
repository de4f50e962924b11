//! Live scheduled-job table over `tokio_cron_scheduler`.
//!
//! All mutation goes through [`SchedulerRuntime::reconcile`], a full rebuild
//! of the job set from the active schedule configurations. There is no
//! incremental diffing; the brief empty-job window during a rebuild is the
//! price of never drifting from the stored configuration.

use crate::data::models::{RunTrigger, ScheduleConfig, ScheduleKind};
use crate::data::schedules;
use crate::github::GithubApi;
use crate::refresh::perform_refresh;
use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};
use uuid::Uuid;

const DAY_NAMES: [&str; 7] = ["MON", "TUE", "WED", "THU", "FRI", "SAT", "SUN"];

/// A job currently registered with the runtime.
#[derive(Debug, Clone)]
struct RegisteredJob {
    guid: Uuid,
    config_name: String,
}

/// Status of one registered job, for introspection endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct JobStatus {
    pub job_id: String,
    pub config_name: String,
    pub next_run: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RuntimeStatus {
    pub active: bool,
    pub jobs: Vec<JobStatus>,
}

/// Process-scoped scheduler runtime. Jobs acquire their own pool/client
/// clones when they fire; nothing request-scoped leaks into them.
pub struct SchedulerRuntime {
    sched: JobScheduler,
    pool: PgPool,
    github: Arc<GithubApi>,
    jobs: Mutex<HashMap<i32, RegisteredJob>>,
    active: AtomicBool,
}

impl SchedulerRuntime {
    /// Create and start the underlying job scheduler. Jobs are registered
    /// separately via [`Self::reconcile`].
    pub async fn new(pool: PgPool, github: Arc<GithubApi>) -> Result<Arc<Self>> {
        let sched = JobScheduler::new()
            .await
            .context("failed to create job scheduler")?;
        sched
            .start()
            .await
            .context("failed to start job scheduler")?;

        Ok(Arc::new(Self {
            sched,
            pool,
            github,
            jobs: Mutex::new(HashMap::new()),
            active: AtomicBool::new(true),
        }))
    }

    /// Rebuild the live job set from all currently-active configurations.
    ///
    /// Removes every registered config-derived job, then re-adds one per
    /// active configuration. Returns the number of registered jobs.
    /// Concurrent callers serialize on the job table lock.
    pub async fn reconcile(&self) -> Result<usize> {
        let mut jobs = self.jobs.lock().await;
        let mut sched = self.sched.clone();

        for (config_id, registered) in jobs.drain() {
            if let Err(e) = sched.remove(&registered.guid).await {
                warn!(config_id, error = %e, "failed to remove job during reconcile");
            }
        }

        let configs = schedules::list_active(&self.pool).await?;
        for config in &configs {
            let job = self
                .build_job(config)
                .with_context(|| format!("failed to build trigger for config {}", config.id))?;
            let guid = job.guid();
            sched
                .add(job)
                .await
                .map_err(|e| anyhow!("failed to register job for config {}: {e}", config.id))?;
            jobs.insert(
                config.id,
                RegisteredJob {
                    guid,
                    config_name: config.name.clone(),
                },
            );
        }

        info!(jobs = jobs.len(), "scheduler reconciled");
        Ok(jobs.len())
    }

    /// Runtime liveness plus every registered job with its next fire time.
    pub async fn status(&self) -> RuntimeStatus {
        let jobs = self.jobs.lock().await;
        let mut sched = self.sched.clone();

        let mut out = Vec::with_capacity(jobs.len());
        for (config_id, registered) in jobs.iter() {
            let next_run = sched
                .next_tick_for_job(registered.guid)
                .await
                .ok()
                .flatten();
            out.push(JobStatus {
                job_id: format!("scheduler_config_{config_id}"),
                config_name: registered.config_name.clone(),
                next_run,
            });
        }
        out.sort_by(|a, b| a.job_id.cmp(&b.job_id));

        RuntimeStatus {
            active: self.active.load(Ordering::Relaxed),
            jobs: out,
        }
    }

    pub async fn shutdown(&self) {
        let mut sched = self.sched.clone();
        if let Err(e) = sched.shutdown().await {
            warn!(error = %e, "job scheduler did not shut down cleanly");
        }
        self.active.store(false, Ordering::Relaxed);
        info!("scheduler runtime stopped");
    }

    /// Materialize one configuration into a scheduler job.
    fn build_job(&self, config: &ScheduleConfig) -> Result<Job> {
        let pool = self.pool.clone();
        let github = self.github.clone();
        let config_id = config.id;
        let keyword = config.keyword.clone();
        let max_results = config.max_results.max(1) as usize;

        let run = move |_uuid: Uuid, _sched: JobScheduler| {
            let pool = pool.clone();
            let github = github.clone();
            let keyword = keyword.clone();
            Box::pin(async move {
                run_scheduled_job(pool, github, config_id, keyword, max_results).await;
            }) as Pin<Box<dyn Future<Output = ()> + Send>>
        };

        let job = match config.schedule_kind {
            ScheduleKind::Interval => {
                let hours = config.interval_hours.unwrap_or(1).max(1) as u64;
                Job::new_repeated_async(Duration::from_secs(hours * 3600), run)?
            }
            ScheduleKind::Cron => {
                let expression = cron_expression(
                    config.cron_hour.unwrap_or(0),
                    config.cron_minute.unwrap_or(0),
                    config.cron_days.as_deref(),
                );
                Job::new_async(expression.as_str(), run)?
            }
        };
        Ok(job)
    }
}

/// Body of a fired job. Errors are logged and recorded on the run row;
/// nothing propagates into the scheduler runtime.
async fn run_scheduled_job(
    pool: PgPool,
    github: Arc<GithubApi>,
    config_id: i32,
    keyword: String,
    max_results: usize,
) {
    info!(config_id, keyword, "scheduled refresh firing");

    match perform_refresh(&pool, &github, RunTrigger::Scheduled, &keyword, max_results).await {
        Ok(run) => info!(
            config_id,
            run_id = run.id,
            status = ?run.status,
            "scheduled refresh finished"
        ),
        Err(e) => error!(config_id, error = ?e, "scheduled refresh could not be recorded"),
    }

    if let Err(e) = schedules::touch_last_executed(&pool, config_id).await {
        warn!(config_id, error = ?e, "failed to stamp last execution time");
    }
}

/// Seconds-resolution cron expression for a calendar schedule.
fn cron_expression(hour: i32, minute: i32, days: Option<&str>) -> String {
    format!("0 {minute} {hour} * * {}", cron_day_field(days))
}

/// Translate a stored day set ("*" or comma list of 0-6, 0=Monday) into
/// cron day names, which every cron dialect numbers the same way.
fn cron_day_field(days: Option<&str>) -> String {
    let list = match days {
        None | Some("*") | Some("") => return "*".to_string(),
        Some(list) => list,
    };

    let named: Vec<&str> = list
        .split(',')
        .filter_map(|d| d.trim().parse::<usize>().ok())
        .filter(|d| *d < 7)
        .map(|d| DAY_NAMES[d])
        .collect();

    if named.is_empty() {
        "*".to_string()
    } else {
        named.join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cron_expression_pins_seconds_to_zero() {
        assert_eq!(cron_expression(2, 0, Some("*")), "0 0 2 * * *");
        assert_eq!(cron_expression(14, 30, None), "0 30 14 * * *");
    }

    #[test]
    fn day_numbers_translate_to_names() {
        assert_eq!(cron_day_field(Some("0")), "MON");
        assert_eq!(cron_day_field(Some("0,2,4")), "MON,WED,FRI");
        assert_eq!(cron_day_field(Some("5,6")), "SAT,SUN");
        assert_eq!(cron_day_field(Some("*")), "*");
        assert_eq!(cron_day_field(None), "*");
    }

    #[test]
    fn junk_day_entries_fall_back_to_any_day() {
        assert_eq!(cron_day_field(Some("9,banana")), "*");
        assert_eq!(cron_day_field(Some("")), "*");
    }

    #[test]
    fn out_of_range_days_are_dropped() {
        assert_eq!(cron_day_field(Some("1,7,3")), "TUE,THU");
    }
}
