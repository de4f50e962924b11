//! Per-day API usage counters, upserted as requests happen.

use crate::data::models::ApiUsageStat;
use anyhow::{Context, Result};
use sqlx::PgPool;

/// Classification of one upstream request for accounting purposes.
///
/// A rate-limited request counts as failed *and* bumps the rate-limit
/// counter, matching how the refresh pipeline treats it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    Success,
    Failed,
    RateLimited,
}

/// Bump today's counters, creating the row on first use of the day.
pub async fn record(pool: &PgPool, outcome: RequestOutcome) -> Result<()> {
    let (successful, failed, rate_limited) = counter_deltas(outcome);

    sqlx::query(
        r#"
        INSERT INTO api_usage_stats (day, total_requests, successful_requests, failed_requests, rate_limit_hits)
        VALUES (CURRENT_DATE, 1, $1, $2, $3)
        ON CONFLICT (day) DO UPDATE SET
            total_requests = api_usage_stats.total_requests + 1,
            successful_requests = api_usage_stats.successful_requests + EXCLUDED.successful_requests,
            failed_requests = api_usage_stats.failed_requests + EXCLUDED.failed_requests,
            rate_limit_hits = api_usage_stats.rate_limit_hits + EXCLUDED.rate_limit_hits,
            updated_at = now()
        "#,
    )
    .bind(successful)
    .bind(failed)
    .bind(rate_limited)
    .execute(pool)
    .await
    .context("failed to upsert API usage counters")?;

    Ok(())
}

/// Most recent `days` of usage counters, newest first.
pub async fn list_recent(pool: &PgPool, days: i32) -> Result<Vec<ApiUsageStat>> {
    let rows = sqlx::query_as::<_, ApiUsageStat>(
        "SELECT * FROM api_usage_stats WHERE day > CURRENT_DATE - $1 ORDER BY day DESC",
    )
    .bind(days)
    .fetch_all(pool)
    .await
    .context("failed to fetch API usage stats")?;
    Ok(rows)
}

fn counter_deltas(outcome: RequestOutcome) -> (i32, i32, i32) {
    match outcome {
        RequestOutcome::Success => (1, 0, 0),
        RequestOutcome::Failed => (0, 1, 0),
        RequestOutcome::RateLimited => (0, 1, 1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limited_counts_as_failed_too() {
        assert_eq!(counter_deltas(RequestOutcome::Success), (1, 0, 0));
        assert_eq!(counter_deltas(RequestOutcome::Failed), (0, 1, 0));
        assert_eq!(counter_deltas(RequestOutcome::RateLimited), (0, 1, 1));
    }
}
