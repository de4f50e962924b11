use crate::config::Config;
use crate::data::models::ScheduleKind;
use crate::data::schedules::{self, ScheduleDraft};
use crate::github::{FetchTuning, GithubApi};
use crate::refresh::run_startup_catchup;
use crate::scheduler::runtime::SchedulerRuntime;
use crate::state::{AppState, RefreshDefaults, ServiceStatus, ServiceStatusRegistry};
use anyhow::{Context, Result};
use sqlx::ConnectOptions;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Name of the schedule configuration seeded on first boot.
const DEFAULT_SCHEDULE_NAME: &str = "default-refresh";

/// Main application struct containing all necessary components.
pub struct App {
    config: Config,
    state: AppState,
}

impl App {
    /// Create a new App instance with all necessary components initialized.
    pub async fn new(config: Config) -> Result<Self> {
        let connect_options = sqlx::postgres::PgConnectOptions::from_str(&config.database_url)
            .context("failed to parse database URL")?
            .log_statements(tracing::log::LevelFilter::Debug)
            .log_slow_statements(tracing::log::LevelFilter::Warn, Duration::from_secs(1));

        let db_pool = PgPoolOptions::new()
            .min_connections(0)
            .max_connections(8)
            .acquire_timeout(Duration::from_secs(4))
            .idle_timeout(Duration::from_secs(60 * 2))
            .max_lifetime(Duration::from_secs(60 * 30))
            .connect_with(connect_options)
            .await
            .context("failed to create database pool")?;
        info!(max_connections = 8, "database pool established");

        sqlx::migrate!("./migrations")
            .run(&db_pool)
            .await
            .context("failed to run database migrations")?;
        info!("database migrations completed");

        let tuning = FetchTuning {
            rate_limit_margin: Duration::from_secs(config.rate_limit_margin_secs),
            page_delay: Duration::from_millis(config.page_delay_ms),
        };
        let github = Arc::new(
            GithubApi::new(
                config.github_base_url.clone(),
                config.github_token.clone(),
                tuning,
                db_pool.clone(),
            )
            .context("failed to create GitHub API client")?,
        );

        // Seed a default interval schedule on first boot so a fresh install
        // refreshes without operator setup. Non-fatal.
        if let Err(e) = seed_default_schedule(&db_pool, &config).await {
            warn!(error = ?e, "failed to seed default schedule (non-fatal)");
        }

        let scheduler = SchedulerRuntime::new(db_pool.clone(), github.clone())
            .await
            .context("failed to start scheduler runtime")?;
        match scheduler.reconcile().await {
            Ok(jobs) => info!(jobs, "initial scheduler reconciliation complete"),
            Err(e) => warn!(error = ?e, "initial scheduler reconciliation failed (non-fatal)"),
        }

        let service_statuses = ServiceStatusRegistry::new();
        service_statuses.set("scheduler", ServiceStatus::Active);
        service_statuses.set("web", ServiceStatus::Starting);

        let state = AppState {
            db_pool: db_pool.clone(),
            github: github.clone(),
            scheduler,
            defaults: Arc::new(RefreshDefaults {
                keyword: config.default_keyword.clone(),
                max_results: config.max_results.max(1) as usize,
            }),
            service_statuses,
        };

        // If no scheduled run has started today, catch up in the background.
        tokio::spawn(run_startup_catchup(
            db_pool,
            github,
            config.default_keyword.clone(),
            config.max_results.max(1) as usize,
        ));

        Ok(App { config, state })
    }

    /// Serve the HTTP API until a shutdown signal arrives, then stop the
    /// scheduler runtime.
    pub async fn run(self) -> Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.port));
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;
        info!(%addr, "HTTP server listening");

        self.state
            .service_statuses
            .set("web", ServiceStatus::Active);

        let scheduler = self.state.scheduler.clone();
        let router = crate::web::create_router(self.state);

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("HTTP server error")?;

        // Bound the background-side shutdown so a wedged job can't hold the
        // process open forever.
        let grace = Duration::from_secs(self.config.shutdown_timeout);
        if tokio::time::timeout(grace, scheduler.shutdown())
            .await
            .is_err()
        {
            warn!("scheduler did not shut down within the grace period");
        }

        info!("shutdown complete");
        Ok(())
    }
}

async fn seed_default_schedule(pool: &sqlx::PgPool, config: &Config) -> Result<()> {
    if schedules::count(pool).await? > 0 {
        return Ok(());
    }

    let draft = ScheduleDraft {
        name: DEFAULT_SCHEDULE_NAME.to_string(),
        schedule_kind: ScheduleKind::Interval,
        interval_hours: Some(config.refresh_interval_hours.max(1) as i32),
        cron_hour: None,
        cron_minute: None,
        cron_days: None,
        keyword: config.default_keyword.clone(),
        max_results: config.max_results.max(1) as i32,
        is_active: true,
        description: Some("Seeded default refresh schedule".to_string()),
    };
    let seeded = schedules::insert(pool, &draft).await?;
    info!(
        config_id = seeded.id,
        interval_hours = ?seeded.interval_hours,
        keyword = %seeded.keyword,
        "seeded default schedule configuration"
    );
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
