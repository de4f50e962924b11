//! Schedule registry: validated CRUD over schedule configurations, each
//! mutation followed by a full runtime reconciliation before it returns.

pub mod runtime;

use crate::data::models::{RefreshRun, RunTrigger, ScheduleConfig, ScheduleKind};
use crate::data::schedules::{self, ScheduleDraft};
use crate::github::GithubApi;
use crate::refresh::perform_refresh;
use runtime::SchedulerRuntime;
use sqlx::PgPool;
use tracing::info;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ScheduleValidationError {
    #[error("schedule name must not be empty")]
    EmptyName,
    #[error("`max_results` must be at least 1")]
    InvalidMaxResults,
    #[error("interval schedules require `interval_hours` of at least 1")]
    MissingInterval,
    #[error("cron schedules require `cron_hour` between 0 and 23")]
    InvalidCronHour,
    #[error("`cron_minute` must be between 0 and 59")]
    InvalidCronMinute,
    #[error("`cron_days` must be `*` or a comma list of day numbers 0-6")]
    InvalidCronDays,
}

#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error(transparent)]
    Invalid(#[from] ScheduleValidationError),
    #[error("schedule configuration not found")]
    NotFound,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Check that the kind-specific fields required by `schedule_kind` are
/// present and in range.
pub fn validate(draft: &ScheduleDraft) -> Result<(), ScheduleValidationError> {
    if draft.name.trim().is_empty() {
        return Err(ScheduleValidationError::EmptyName);
    }
    if draft.max_results < 1 {
        return Err(ScheduleValidationError::InvalidMaxResults);
    }

    match draft.schedule_kind {
        ScheduleKind::Interval => match draft.interval_hours {
            Some(hours) if hours >= 1 => Ok(()),
            _ => Err(ScheduleValidationError::MissingInterval),
        },
        ScheduleKind::Cron => {
            match draft.cron_hour {
                Some(hour) if (0..=23).contains(&hour) => {}
                _ => return Err(ScheduleValidationError::InvalidCronHour),
            }
            if let Some(minute) = draft.cron_minute
                && !(0..=59).contains(&minute)
            {
                return Err(ScheduleValidationError::InvalidCronMinute);
            }
            if let Some(days) = draft.cron_days.as_deref() {
                validate_days(days)?;
            }
            Ok(())
        }
    }
}

fn validate_days(days: &str) -> Result<(), ScheduleValidationError> {
    if days == "*" {
        return Ok(());
    }
    if days.trim().is_empty() {
        return Err(ScheduleValidationError::InvalidCronDays);
    }
    for part in days.split(',') {
        match part.trim().parse::<u8>() {
            Ok(day) if day <= 6 => {}
            _ => return Err(ScheduleValidationError::InvalidCronDays),
        }
    }
    Ok(())
}

/// Clear the fields belonging to the other schedule kind and fill cron
/// defaults, so a kind switch can never leave stale parameters behind.
pub fn normalize(mut draft: ScheduleDraft) -> ScheduleDraft {
    match draft.schedule_kind {
        ScheduleKind::Interval => {
            draft.cron_hour = None;
            draft.cron_minute = None;
            draft.cron_days = None;
        }
        ScheduleKind::Cron => {
            draft.interval_hours = None;
            draft.cron_minute = Some(draft.cron_minute.unwrap_or(0));
            draft.cron_days = Some(draft.cron_days.unwrap_or_else(|| "*".to_string()));
        }
    }
    draft
}

pub async fn create_schedule(
    pool: &PgPool,
    runtime: &SchedulerRuntime,
    draft: ScheduleDraft,
) -> Result<ScheduleConfig, ScheduleError> {
    validate(&draft)?;
    let draft = normalize(draft);
    let config = schedules::insert(pool, &draft).await?;
    runtime.reconcile().await?;
    info!(config_id = config.id, name = %config.name, "schedule created");
    Ok(config)
}

pub async fn update_schedule(
    pool: &PgPool,
    runtime: &SchedulerRuntime,
    id: i32,
    draft: ScheduleDraft,
) -> Result<ScheduleConfig, ScheduleError> {
    validate(&draft)?;
    let draft = normalize(draft);
    let config = schedules::update(pool, id, &draft)
        .await?
        .ok_or(ScheduleError::NotFound)?;
    runtime.reconcile().await?;
    info!(config_id = config.id, name = %config.name, "schedule updated");
    Ok(config)
}

pub async fn toggle_schedule(
    pool: &PgPool,
    runtime: &SchedulerRuntime,
    id: i32,
) -> Result<ScheduleConfig, ScheduleError> {
    let config = schedules::toggle(pool, id)
        .await?
        .ok_or(ScheduleError::NotFound)?;
    runtime.reconcile().await?;
    info!(
        config_id = config.id,
        is_active = config.is_active,
        "schedule toggled"
    );
    Ok(config)
}

pub async fn delete_schedule(
    pool: &PgPool,
    runtime: &SchedulerRuntime,
    id: i32,
) -> Result<(), ScheduleError> {
    if !schedules::delete(pool, id).await? {
        return Err(ScheduleError::NotFound);
    }
    runtime.reconcile().await?;
    info!(config_id = id, "schedule deleted");
    Ok(())
}

/// Run a configuration's refresh immediately, outside its schedule, and
/// stamp `last_executed_at`.
pub async fn execute_now(
    pool: &PgPool,
    github: &GithubApi,
    id: i32,
) -> Result<RefreshRun, ScheduleError> {
    let config = schedules::get(pool, id).await?.ok_or(ScheduleError::NotFound)?;

    let run = perform_refresh(
        pool,
        github,
        RunTrigger::Manual,
        &config.keyword,
        config.max_results.max(1) as usize,
    )
    .await?;

    schedules::touch_last_executed(pool, id).await?;
    Ok(run)
}

/// Human-readable rendering of a configuration's recurrence. Derived on
/// demand, never stored.
pub fn describe_schedule(config: &ScheduleConfig) -> String {
    const DAY_NAMES: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

    match config.schedule_kind {
        ScheduleKind::Interval => match config.interval_hours {
            Some(1) => "every hour".to_string(),
            Some(hours) => format!("every {hours} hours"),
            None => "interval unset".to_string(),
        },
        ScheduleKind::Cron => {
            let hour = config.cron_hour.unwrap_or(0);
            let minute = config.cron_minute.unwrap_or(0);
            let days = match config.cron_days.as_deref() {
                None | Some("*") => "every day".to_string(),
                Some(list) => {
                    let named: Vec<&str> = list
                        .split(',')
                        .filter_map(|d| d.trim().parse::<usize>().ok())
                        .filter(|d| *d < 7)
                        .map(|d| DAY_NAMES[d])
                        .collect();
                    if named.is_empty() {
                        "every day".to_string()
                    } else {
                        named.join(", ")
                    }
                }
            };
            format!("{days} {hour:02}:{minute:02}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn draft(kind: ScheduleKind) -> ScheduleDraft {
        ScheduleDraft {
            name: "nightly".to_string(),
            schedule_kind: kind,
            interval_hours: None,
            cron_hour: None,
            cron_minute: None,
            cron_days: None,
            keyword: "AI".to_string(),
            max_results: 1000,
            is_active: true,
            description: None,
        }
    }

    fn config(kind: ScheduleKind) -> ScheduleConfig {
        ScheduleConfig {
            id: 1,
            name: "nightly".to_string(),
            schedule_kind: kind,
            interval_hours: None,
            cron_hour: None,
            cron_minute: None,
            cron_days: None,
            keyword: "AI".to_string(),
            max_results: 1000,
            is_active: true,
            description: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_executed_at: None,
        }
    }

    #[test]
    fn interval_requires_hours() {
        let missing = draft(ScheduleKind::Interval);
        assert_eq!(
            validate(&missing),
            Err(ScheduleValidationError::MissingInterval)
        );

        let zero = ScheduleDraft {
            interval_hours: Some(0),
            ..draft(ScheduleKind::Interval)
        };
        assert_eq!(validate(&zero), Err(ScheduleValidationError::MissingInterval));

        let ok = ScheduleDraft {
            interval_hours: Some(6),
            ..draft(ScheduleKind::Interval)
        };
        assert_eq!(validate(&ok), Ok(()));
    }

    #[test]
    fn cron_requires_hour_in_range() {
        let missing = draft(ScheduleKind::Cron);
        assert_eq!(
            validate(&missing),
            Err(ScheduleValidationError::InvalidCronHour)
        );

        let late = ScheduleDraft {
            cron_hour: Some(24),
            ..draft(ScheduleKind::Cron)
        };
        assert_eq!(validate(&late), Err(ScheduleValidationError::InvalidCronHour));

        let ok = ScheduleDraft {
            cron_hour: Some(2),
            cron_minute: Some(0),
            cron_days: Some("*".to_string()),
            ..draft(ScheduleKind::Cron)
        };
        assert_eq!(validate(&ok), Ok(()));
    }

    #[test]
    fn cron_day_lists_are_checked() {
        let bad = ScheduleDraft {
            cron_hour: Some(2),
            cron_days: Some("1,7".to_string()),
            ..draft(ScheduleKind::Cron)
        };
        assert_eq!(validate(&bad), Err(ScheduleValidationError::InvalidCronDays));

        let ok = ScheduleDraft {
            cron_hour: Some(2),
            cron_days: Some("0,2,4".to_string()),
            ..draft(ScheduleKind::Cron)
        };
        assert_eq!(validate(&ok), Ok(()));
    }

    #[test]
    fn normalize_clears_cross_kind_fields() {
        let mixed = ScheduleDraft {
            interval_hours: Some(6),
            cron_hour: Some(2),
            cron_minute: Some(30),
            cron_days: Some("0".to_string()),
            ..draft(ScheduleKind::Interval)
        };
        let normalized = normalize(mixed);
        assert_eq!(normalized.interval_hours, Some(6));
        assert_eq!(normalized.cron_hour, None);
        assert_eq!(normalized.cron_minute, None);
        assert_eq!(normalized.cron_days, None);

        let mixed = ScheduleDraft {
            interval_hours: Some(6),
            cron_hour: Some(2),
            cron_minute: None,
            cron_days: None,
            ..draft(ScheduleKind::Cron)
        };
        let normalized = normalize(mixed);
        assert_eq!(normalized.interval_hours, None);
        assert_eq!(normalized.cron_hour, Some(2));
        assert_eq!(normalized.cron_minute, Some(0));
        assert_eq!(normalized.cron_days.as_deref(), Some("*"));
    }

    #[test]
    fn schedule_display_for_intervals() {
        let mut c = config(ScheduleKind::Interval);
        c.interval_hours = Some(6);
        assert_eq!(describe_schedule(&c), "every 6 hours");

        c.interval_hours = Some(1);
        assert_eq!(describe_schedule(&c), "every hour");
    }

    #[test]
    fn schedule_display_for_cron() {
        let mut c = config(ScheduleKind::Cron);
        c.cron_hour = Some(2);
        c.cron_minute = Some(0);
        c.cron_days = Some("*".to_string());
        assert_eq!(describe_schedule(&c), "every day 02:00");

        c.cron_days = Some("0,2".to_string());
        c.cron_minute = Some(30);
        assert_eq!(describe_schedule(&c), "Mon, Wed 02:30");
    }
}
