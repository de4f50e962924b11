//! Process configuration, loaded once at startup from the environment.

use serde::Deserialize;

/// Application configuration.
///
/// Every field maps to an environment variable of the same name (uppercased).
/// Only `DATABASE_URL` is required.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// PostgreSQL connection string.
    pub database_url: String,

    /// Port for the HTTP API server.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Base URL of the GitHub REST API.
    #[serde(default = "default_github_base_url")]
    pub github_base_url: String,

    /// Optional bearer token to raise the search rate limit.
    #[serde(default)]
    pub github_token: Option<String>,

    /// Keyword used when a manual or startup refresh doesn't supply one.
    #[serde(default = "default_keyword")]
    pub default_keyword: String,

    /// Per-refresh cap on fetched repositories.
    #[serde(default = "default_max_results")]
    pub max_results: u32,

    /// Interval for the seeded default schedule configuration.
    #[serde(default = "default_refresh_interval_hours")]
    pub refresh_interval_hours: u32,

    /// Default page size for project listing endpoints.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Base log level for this crate's tracing filter.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Extra seconds slept past the upstream rate-limit reset time.
    #[serde(default = "default_rate_limit_margin_secs")]
    pub rate_limit_margin_secs: u64,

    /// Delay between successive search pages, in milliseconds.
    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,

    /// Seconds to wait for in-flight requests during shutdown.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout: u64,
}

fn default_port() -> u16 {
    8080
}

fn default_github_base_url() -> String {
    "https://api.github.com".to_string()
}

fn default_keyword() -> String {
    "AI".to_string()
}

fn default_max_results() -> u32 {
    1000
}

fn default_refresh_interval_hours() -> u32 {
    6
}

fn default_page_size() -> u32 {
    20
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_rate_limit_margin_secs() -> u64 {
    10
}

fn default_page_delay_ms() -> u64 {
    1000
}

fn default_shutdown_timeout() -> u64 {
    10
}
