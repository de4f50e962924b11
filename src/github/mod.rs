//! GitHub search API client: query construction, pagination, and
//! rate-limit backoff.

pub mod errors;
pub mod json;
pub mod models;

pub use errors::GithubApiError;
pub use models::{Repository, SearchResponse};

use crate::data::api_stats::{self, RequestOutcome};
use anyhow::Context;
use sqlx::PgPool;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, error, warn};

/// Upstream maximum page size for search results.
pub const MAX_PAGE_SIZE: u32 = 100;

/// The search API never serves results past this offset, regardless of
/// `total_count`.
pub const UPSTREAM_RESULT_CAP: usize = 1000;

/// Client-side pacing knobs, wired from [`crate::config::Config`].
#[derive(Debug, Clone)]
pub struct FetchTuning {
    /// Extra sleep past the advertised rate-limit reset.
    pub rate_limit_margin: Duration,
    /// Pause between successive pages of one fetch.
    pub page_delay: Duration,
}

/// One successfully parsed page of search results.
#[derive(Debug)]
pub struct SearchPage {
    pub total_count: i64,
    pub items: Vec<Repository>,
}

/// Everything a full paginated fetch produced.
#[derive(Debug)]
pub struct FetchOutcome {
    pub items: Vec<Repository>,
    /// Number of search requests issued, including failed ones.
    pub requests: u32,
}

/// Client for the GitHub repository search endpoint.
///
/// Holds the connection pool so every request, successful or not, can bump
/// the per-day usage counters.
pub struct GithubApi {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
    tuning: FetchTuning,
    pool: PgPool,
}

impl GithubApi {
    pub fn new(
        base_url: String,
        token: Option<String>,
        tuning: FetchTuning,
        pool: PgPool,
    ) -> Result<Self, anyhow::Error> {
        url::Url::parse(&base_url).context("invalid GitHub base URL")?;

        let http = reqwest::Client::builder()
            .user_agent(concat!("repowatch/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            tuning,
            pool,
        })
    }

    /// Run one search request for a single page of results.
    ///
    /// `per_page` is clamped to the upstream maximum of 100. A 403 response
    /// sleeps until the advertised reset (plus the configured margin) before
    /// returning [`GithubApiError::RateLimited`]; the caller decides whether
    /// to retry or abort.
    pub async fn search(
        &self,
        keyword: &str,
        sort: &str,
        order: &str,
        per_page: u32,
        page: u32,
    ) -> Result<SearchPage, GithubApiError> {
        let per_page = per_page.min(MAX_PAGE_SIZE);
        let url = format!("{}/search/repositories", self.base_url);

        let mut request = self
            .http
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .query(&[("q", keyword), ("sort", sort), ("order", order)])
            .query(&[("per_page", per_page), ("page", page)]);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                self.record(RequestOutcome::Failed).await;
                warn!(error = %e, "GitHub search request failed to complete");
                return Err(e.into());
            }
        };

        let status = response.status();
        if status == reqwest::StatusCode::FORBIDDEN {
            self.record(RequestOutcome::RateLimited).await;
            let waited = self.backoff_until_reset(response.headers()).await;
            return Err(GithubApiError::RateLimited {
                waited_secs: waited.as_secs(),
            });
        }
        if !status.is_success() {
            self.record(RequestOutcome::Failed).await;
            error!(status = status.as_u16(), "GitHub search returned an error status");
            return Err(GithubApiError::Upstream {
                status: status.as_u16(),
            });
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                self.record(RequestOutcome::Failed).await;
                return Err(e.into());
            }
        };

        match json::parse_json_with_path::<SearchResponse>(&body) {
            Ok(parsed) => {
                self.record(RequestOutcome::Success).await;
                Ok(SearchPage {
                    total_count: parsed.total_count,
                    items: parsed.items,
                })
            }
            Err(e) => {
                self.record(RequestOutcome::Failed).await;
                error!(error = %e, "GitHub search response did not match the expected schema");
                Err(GithubApiError::Parse(e))
            }
        }
    }

    /// Fetch up to `max_results` repositories for a keyword, page by page.
    ///
    /// Stops when the cap is reached, the upstream `total_count` is
    /// exhausted, the 1000-result upstream window closes, a page comes back
    /// empty, or a page fails. A failed page aborts the remainder of the
    /// fetch; whatever was already collected is returned.
    pub async fn fetch_all(&self, keyword: &str, max_results: usize) -> FetchOutcome {
        let mut items: Vec<Repository> = Vec::new();
        let mut requests = 0u32;
        let mut page = 1u32;

        while items.len() < max_results {
            debug!(keyword, page, collected = items.len(), "fetching search page");
            requests += 1;

            let search_page = match self
                .search(keyword, "stars", "desc", MAX_PAGE_SIZE, page)
                .await
            {
                Ok(search_page) => search_page,
                Err(e) => {
                    warn!(error = %e, page, "aborting fetch after failed page");
                    break;
                }
            };

            if search_page.items.is_empty() {
                break;
            }
            items.extend(search_page.items);

            if items.len() as i64 >= search_page.total_count {
                break;
            }
            if (page * MAX_PAGE_SIZE) as usize >= UPSTREAM_RESULT_CAP {
                break;
            }

            page += 1;
            tokio::time::sleep(self.tuning.page_delay).await;
        }

        items.truncate(max_results);
        FetchOutcome { items, requests }
    }

    /// Sleep until the epoch second in `X-RateLimit-Reset`, plus margin.
    ///
    /// Returns the total time slept. A reset in the past sleeps nothing.
    async fn backoff_until_reset(&self, headers: &reqwest::header::HeaderMap) -> Duration {
        let reset_epoch = headers
            .get("x-ratelimit-reset")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0);
        let now_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        let remaining = reset_epoch.saturating_sub(now_epoch);
        if remaining == 0 {
            warn!("GitHub rate limit hit with no usable reset time");
            return Duration::ZERO;
        }

        let total = Duration::from_secs(remaining) + self.tuning.rate_limit_margin;
        warn!(
            wait_secs = total.as_secs(),
            "GitHub rate limit hit, sleeping until reset"
        );
        tokio::time::sleep(total).await;
        total
    }

    /// Usage accounting is best-effort; a counter failure never fails a fetch.
    async fn record(&self, outcome: RequestOutcome) {
        if let Err(e) = api_stats::record(&self.pool, outcome).await {
            warn!(error = ?e, "failed to update API usage counters");
        }
    }
}
