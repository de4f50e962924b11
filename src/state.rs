//! Application state shared across the web layer and scheduler.

use crate::github::GithubApi;
use crate::scheduler::runtime::SchedulerRuntime;
use dashmap::DashMap;
use serde::Serialize;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Instant;

/// Health status of a service.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Starting,
    Active,
    Error,
}

#[derive(Debug, Clone)]
struct StatusEntry {
    status: ServiceStatus,
    #[allow(dead_code)]
    updated_at: Instant,
}

/// Thread-safe registry for services to self-report their health status.
#[derive(Debug, Clone, Default)]
pub struct ServiceStatusRegistry {
    inner: Arc<DashMap<String, StatusEntry>>,
}

impl ServiceStatusRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or updates the status for a named service.
    pub fn set(&self, name: &str, status: ServiceStatus) {
        self.inner.insert(
            name.to_owned(),
            StatusEntry {
                status,
                updated_at: Instant::now(),
            },
        );
    }

    /// Returns a snapshot of all service statuses.
    pub fn all(&self) -> Vec<(String, ServiceStatus)> {
        self.inner
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().status.clone()))
            .collect()
    }
}

/// Fallbacks for manual refreshes that don't supply parameters.
#[derive(Debug, Clone)]
pub struct RefreshDefaults {
    pub keyword: String,
    pub max_results: usize,
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub github: Arc<GithubApi>,
    pub scheduler: Arc<SchedulerRuntime>,
    pub defaults: Arc<RefreshDefaults>,
    pub service_statuses: ServiceStatusRegistry,
}
