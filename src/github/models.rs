//! Wire models for the GitHub repository search API.
//!
//! Fields are deliberately lenient: everything beyond the envelope gets a
//! serde default so a single degenerate item surfaces as an upsert-level
//! validation failure instead of sinking the whole page parse.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Response envelope of `GET /search/repositories`.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    pub total_count: i64,
    #[serde(default)]
    pub incomplete_results: bool,
    pub items: Vec<Repository>,
}

/// One repository item as returned by the search endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Repository {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub owner: Option<RepoOwner>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub stargazers_count: i64,
    #[serde(default)]
    pub forks_count: i64,
    #[serde(default)]
    pub watchers_count: i64,
    #[serde(default)]
    pub open_issues_count: i64,
    /// Repository size in kilobytes.
    #[serde(default)]
    pub size: i64,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub license: Option<RepoLicense>,
    #[serde(default = "default_branch")]
    pub default_branch: String,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub fork: bool,
    #[serde(default = "default_true")]
    pub has_issues: bool,
    #[serde(default = "default_true")]
    pub has_projects: bool,
    #[serde(default = "default_true")]
    pub has_wiki: bool,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default = "default_visibility")]
    pub visibility: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub pushed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RepoOwner {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RepoLicense {
    #[serde(default)]
    pub name: Option<String>,
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_visibility() -> String {
    "public".to_string()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_search_item() {
        let body = r#"{
            "total_count": 12345,
            "incomplete_results": false,
            "items": [{
                "name": "tokio",
                "full_name": "tokio-rs/tokio",
                "owner": {"login": "tokio-rs"},
                "description": "A runtime for writing reliable async applications",
                "html_url": "https://github.com/tokio-rs/tokio",
                "stargazers_count": 26000,
                "forks_count": 2400,
                "watchers_count": 26000,
                "open_issues_count": 300,
                "size": 15000,
                "language": "Rust",
                "topics": ["async", "rust", "networking"],
                "license": {"name": "MIT License"},
                "default_branch": "master",
                "private": false,
                "fork": false,
                "archived": false,
                "disabled": false,
                "visibility": "public",
                "created_at": "2016-08-26T21:09:40Z",
                "updated_at": "2024-03-01T10:00:00Z",
                "pushed_at": "2024-03-01T09:00:00Z"
            }]
        }"#;

        let parsed: SearchResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.total_count, 12345);
        assert_eq!(parsed.items.len(), 1);

        let repo = &parsed.items[0];
        assert_eq!(repo.name, "tokio");
        assert_eq!(repo.owner.as_ref().unwrap().login, "tokio-rs");
        assert_eq!(repo.license.as_ref().unwrap().name.as_deref(), Some("MIT License"));
        assert_eq!(repo.default_branch, "master");
        assert!(repo.created_at.is_some());
    }

    #[test]
    fn missing_item_fields_fall_back_to_defaults() {
        // A malformed item must not fail the page parse; validation happens
        // later, at upsert time.
        let body = r#"{
            "total_count": 1,
            "items": [{"full_name": "ghost/abandoned"}]
        }"#;

        let parsed: SearchResponse = serde_json::from_str(body).unwrap();
        let repo = &parsed.items[0];
        assert_eq!(repo.name, "");
        assert!(repo.owner.is_none());
        assert_eq!(repo.default_branch, "main");
        assert_eq!(repo.visibility, "public");
        assert!(repo.has_issues);
        assert!(repo.topics.is_empty());
    }

    #[test]
    fn null_license_is_accepted() {
        let body = r#"{
            "total_count": 1,
            "items": [{
                "name": "thing",
                "full_name": "a/thing",
                "owner": {"login": "a"},
                "html_url": "https://github.com/a/thing",
                "license": null
            }]
        }"#;

        let parsed: SearchResponse = serde_json::from_str(body).unwrap();
        assert!(parsed.items[0].license.is_none());
    }
}
