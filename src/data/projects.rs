//! Project persistence: the upsert engine plus listing and aggregate queries.

use crate::data::models::Project;
use crate::data::refresh_runs;
use crate::github::Repository;
use anyhow::{Context, Result};
use serde::Serialize;
use sqlx::{Acquire, PgPool, Postgres, Transaction};
use tracing::{info, warn};

/// Topics beyond this count are dropped before persistence.
pub const MAX_TOPICS: usize = 20;

#[derive(Debug, thiserror::Error)]
pub enum ProjectSaveError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Created,
    Updated,
}

/// Aggregated result of one upsert batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub total: usize,
    pub new: usize,
    pub updated: usize,
    pub failed: usize,
}

/// Upsert a batch of fetched repositories and stamp the run's counters.
///
/// The whole batch runs in one transaction; each item gets a savepoint so a
/// failing item rolls back alone and the rest still commit. The run row's
/// fetched/new/updated counters are written inside the same transaction,
/// just before the final commit.
pub async fn save_batch(pool: &PgPool, items: &[Repository], run_id: i32) -> Result<BatchReport> {
    let mut report = BatchReport {
        total: items.len(),
        ..Default::default()
    };

    let mut tx = pool
        .begin()
        .await
        .context("failed to open upsert transaction")?;

    for item in items {
        let mut sp = tx.begin().await.context("failed to open item savepoint")?;
        match save_one(&mut sp, item).await {
            Ok(outcome) => {
                sp.commit().await.context("failed to release item savepoint")?;
                match outcome {
                    SaveOutcome::Created => report.new += 1,
                    SaveOutcome::Updated => report.updated += 1,
                }
            }
            Err(e) => {
                sp.rollback()
                    .await
                    .context("failed to roll back item savepoint")?;
                warn!(repo = %item.full_name, error = %e, "skipping item that failed to save");
                report.failed += 1;
            }
        }
    }

    refresh_runs::set_batch_counts(
        &mut *tx,
        run_id,
        report.total as i32,
        report.new as i32,
        report.updated as i32,
    )
    .await
    .context("failed to update run counters")?;

    tx.commit().await.context("failed to commit upsert batch")?;

    info!(
        new = report.new,
        updated = report.updated,
        failed = report.failed,
        "project batch saved"
    );
    Ok(report)
}

/// Create or update one project row, keyed by (name, owner).
///
/// Updates overwrite the mutable snapshot fields and bump `fetch_count`;
/// creation-only fields (default branch, privacy, fork flag, visibility,
/// feature flags, remote created_at) are left untouched.
async fn save_one(
    tx: &mut Transaction<'_, Postgres>,
    item: &Repository,
) -> Result<SaveOutcome, ProjectSaveError> {
    let owner = validate_item(item)?;

    let topics = sqlx::types::Json(capped_topics(&item.topics));
    let license_name = item.license.as_ref().and_then(|l| l.name.clone());

    let existing: Option<(i32,)> =
        sqlx::query_as("SELECT id FROM projects WHERE name = $1 AND owner = $2")
            .bind(&item.name)
            .bind(owner)
            .fetch_optional(&mut **tx)
            .await?;

    match existing {
        Some((id,)) => {
            sqlx::query(
                r#"
                UPDATE projects SET
                    description = $2,
                    stars_count = $3,
                    forks_count = $4,
                    watchers_count = $5,
                    open_issues_count = $6,
                    size_kb = $7,
                    language = $8,
                    topics = $9,
                    license_name = $10,
                    updated_at = $11,
                    pushed_at = $12,
                    archived = $13,
                    disabled = $14,
                    last_fetched_at = now(),
                    fetch_count = fetch_count + 1
                WHERE id = $1
                "#,
            )
            .bind(id)
            .bind(&item.description)
            .bind(clamp_count(item.stargazers_count))
            .bind(clamp_count(item.forks_count))
            .bind(clamp_count(item.watchers_count))
            .bind(clamp_count(item.open_issues_count))
            .bind(clamp_count(item.size))
            .bind(&item.language)
            .bind(topics)
            .bind(license_name)
            .bind(item.updated_at)
            .bind(item.pushed_at)
            .bind(item.archived)
            .bind(item.disabled)
            .execute(&mut **tx)
            .await?;
            Ok(SaveOutcome::Updated)
        }
        None => {
            sqlx::query(
                r#"
                INSERT INTO projects (
                    name, full_name, owner, description, html_url,
                    stars_count, forks_count, watchers_count, open_issues_count, size_kb,
                    language, topics, license_name, default_branch,
                    is_private, is_fork, has_issues, has_projects, has_wiki,
                    archived, disabled, visibility,
                    created_at, updated_at, pushed_at
                ) VALUES (
                    $1, $2, $3, $4, $5,
                    $6, $7, $8, $9, $10,
                    $11, $12, $13, $14,
                    $15, $16, $17, $18, $19,
                    $20, $21, $22,
                    $23, $24, $25
                )
                "#,
            )
            .bind(&item.name)
            .bind(&item.full_name)
            .bind(owner)
            .bind(&item.description)
            .bind(&item.html_url)
            .bind(clamp_count(item.stargazers_count))
            .bind(clamp_count(item.forks_count))
            .bind(clamp_count(item.watchers_count))
            .bind(clamp_count(item.open_issues_count))
            .bind(clamp_count(item.size))
            .bind(&item.language)
            .bind(topics)
            .bind(license_name)
            .bind(&item.default_branch)
            .bind(item.private)
            .bind(item.fork)
            .bind(item.has_issues)
            .bind(item.has_projects)
            .bind(item.has_wiki)
            .bind(item.archived)
            .bind(item.disabled)
            .bind(&item.visibility)
            .bind(item.created_at)
            .bind(item.updated_at)
            .bind(item.pushed_at)
            .execute(&mut **tx)
            .await?;
            Ok(SaveOutcome::Created)
        }
    }
}

/// Filters for the project listing endpoints.
#[derive(Debug, Default)]
pub struct ProjectFilter<'a> {
    pub keyword: Option<&'a str>,
    pub owner: Option<&'a str>,
    pub language: Option<&'a str>,
}

/// Validate a sort key and return the matching column.
pub fn sort_column(sort: &str) -> Option<&'static str> {
    match sort {
        "stars" | "stars_count" => Some("stars_count"),
        "updated" | "updated_at" => Some("updated_at"),
        "name" => Some("name"),
        _ => None,
    }
}

/// Validate a sort direction.
pub fn sort_direction(order: &str) -> Option<&'static str> {
    match order {
        "asc" => Some("ASC"),
        "desc" => Some("DESC"),
        _ => None,
    }
}

const PROJECT_WHERE: &str = r#"
    ($1::text IS NULL OR name ILIKE $1 OR full_name ILIKE $1 OR description ILIKE $1)
    AND ($2::text IS NULL OR owner ILIKE $2)
    AND ($3::text IS NULL OR language = $3)
"#;

/// Paginated, filtered project listing. Returns the page plus the total
/// count matching the filter.
pub async fn search(
    pool: &PgPool,
    filter: &ProjectFilter<'_>,
    sort: &str,
    order: &str,
    page: u32,
    per_page: u32,
) -> Result<(Vec<Project>, i64)> {
    let column = sort_column(sort).unwrap_or("stars_count");
    let direction = sort_direction(order).unwrap_or("DESC");
    let offset = (page.max(1) as i64 - 1) * per_page as i64;

    let keyword_pattern = filter.keyword.map(|k| format!("%{k}%"));
    let owner_pattern = filter.owner.map(|o| format!("%{o}%"));

    let total: i64 = sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM projects WHERE {PROJECT_WHERE}"
    ))
    .bind(&keyword_pattern)
    .bind(&owner_pattern)
    .bind(filter.language)
    .fetch_one(pool)
    .await
    .context("failed to count projects")?;

    let rows = sqlx::query_as::<_, Project>(&format!(
        "SELECT * FROM projects WHERE {PROJECT_WHERE} ORDER BY {column} {direction} LIMIT $4 OFFSET $5"
    ))
    .bind(&keyword_pattern)
    .bind(&owner_pattern)
    .bind(filter.language)
    .bind(per_page as i64)
    .bind(offset)
    .fetch_all(pool)
    .await
    .context("failed to fetch projects")?;

    Ok((rows, total))
}

pub async fn get(pool: &PgPool, id: i32) -> Result<Option<Project>> {
    let row = sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch project")?;
    Ok(row)
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct LanguageStat {
    pub language: String,
    pub count: i64,
    pub total_stars: i64,
}

/// All languages with project counts, alphabetical.
pub async fn language_counts(pool: &PgPool) -> Result<Vec<LanguageStat>> {
    let rows = sqlx::query_as::<_, LanguageStat>(
        r#"
        SELECT language, COUNT(*) AS count, COALESCE(SUM(stars_count), 0)::bigint AS total_stars
        FROM projects
        WHERE language IS NOT NULL
        GROUP BY language
        ORDER BY language
        "#,
    )
    .fetch_all(pool)
    .await
    .context("failed to fetch language counts")?;
    Ok(rows)
}

/// Most common languages by project count.
pub async fn top_languages(pool: &PgPool, limit: i64) -> Result<Vec<LanguageStat>> {
    let rows = sqlx::query_as::<_, LanguageStat>(
        r#"
        SELECT language, COUNT(*) AS count, COALESCE(SUM(stars_count), 0)::bigint AS total_stars
        FROM projects
        WHERE language IS NOT NULL
        GROUP BY language
        ORDER BY count DESC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("failed to fetch top languages")?;
    Ok(rows)
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProjectTotals {
    pub total: i64,
    pub total_stars: i64,
    pub total_forks: i64,
}

pub async fn totals(pool: &PgPool) -> Result<ProjectTotals> {
    let row = sqlx::query_as::<_, ProjectTotals>(
        r#"
        SELECT COUNT(*) AS total,
               COALESCE(SUM(stars_count), 0)::bigint AS total_stars,
               COALESCE(SUM(forks_count), 0)::bigint AS total_forks
        FROM projects
        "#,
    )
    .fetch_one(pool)
    .await
    .context("failed to fetch project totals")?;
    Ok(row)
}

/// Check the fields the unique key and row constraints depend on, returning
/// the owner login.
fn validate_item(item: &Repository) -> Result<&str, ProjectSaveError> {
    let owner = item
        .owner
        .as_ref()
        .map(|o| o.login.as_str())
        .filter(|login| !login.is_empty())
        .ok_or(ProjectSaveError::MissingField("owner"))?;
    if item.name.is_empty() {
        return Err(ProjectSaveError::MissingField("name"));
    }
    if item.html_url.is_empty() {
        return Err(ProjectSaveError::MissingField("html_url"));
    }
    Ok(owner)
}

fn capped_topics(topics: &[String]) -> Vec<String> {
    topics.iter().take(MAX_TOPICS).cloned().collect()
}

fn clamp_count(value: i64) -> i32 {
    value.clamp(0, i32::MAX as i64) as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::models::RepoOwner;

    #[test]
    fn sort_whitelist_rejects_unknown_columns() {
        assert_eq!(sort_column("stars"), Some("stars_count"));
        assert_eq!(sort_column("stars_count"), Some("stars_count"));
        assert_eq!(sort_column("updated_at"), Some("updated_at"));
        assert_eq!(sort_column("name"), Some("name"));
        assert_eq!(sort_column("id; DROP TABLE projects"), None);

        assert_eq!(sort_direction("asc"), Some("ASC"));
        assert_eq!(sort_direction("desc"), Some("DESC"));
        assert_eq!(sort_direction("sideways"), None);
    }

    #[test]
    fn topics_are_capped_at_twenty() {
        let topics: Vec<String> = (0..30).map(|i| format!("topic-{i}")).collect();
        let capped = capped_topics(&topics);
        assert_eq!(capped.len(), MAX_TOPICS);
        assert_eq!(capped[0], "topic-0");
        assert_eq!(capped[19], "topic-19");
    }

    #[test]
    fn counts_clamp_into_i32_range() {
        assert_eq!(clamp_count(-5), 0);
        assert_eq!(clamp_count(42), 42);
        assert_eq!(clamp_count(i64::MAX), i32::MAX);
    }

    #[test]
    fn malformed_items_fail_validation_before_any_sql() {
        let valid = Repository {
            name: "thing".into(),
            full_name: "ghost/thing".into(),
            html_url: "https://github.com/ghost/thing".into(),
            owner: Some(RepoOwner {
                login: "ghost".into(),
            }),
            ..Default::default()
        };
        assert_eq!(validate_item(&valid).unwrap(), "ghost");

        let no_owner = Repository {
            owner: None,
            ..valid.clone()
        };
        assert!(matches!(
            validate_item(&no_owner),
            Err(ProjectSaveError::MissingField("owner"))
        ));

        let blank_owner = Repository {
            owner: Some(RepoOwner { login: "".into() }),
            ..valid.clone()
        };
        assert!(matches!(
            validate_item(&blank_owner),
            Err(ProjectSaveError::MissingField("owner"))
        ));

        let no_name = Repository {
            name: "".into(),
            ..valid.clone()
        };
        assert!(matches!(
            validate_item(&no_name),
            Err(ProjectSaveError::MissingField("name"))
        ));

        let no_url = Repository {
            html_url: "".into(),
            ..valid
        };
        assert!(matches!(
            validate_item(&no_url),
            Err(ProjectSaveError::MissingField("html_url"))
        ));
    }
}
