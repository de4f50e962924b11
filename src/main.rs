use clap::Parser;
use figment::{Figment, providers::Env};
use repowatch::app::App;
use repowatch::cli::Args;
use repowatch::config::Config;
use repowatch::logging::setup_logging;
use std::process::ExitCode;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Load config before anything else so logging setup can use it and
    // startup logs are never silently dropped.
    let config: Config = Figment::new()
        .merge(Env::raw())
        .extract()
        .expect("Failed to load config");
    setup_logging(&config, args.tracing);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = if cfg!(debug_assertions) {
            "development"
        } else {
            "production"
        },
        "starting repowatch"
    );

    let app = match App::new(config).await {
        Ok(app) => app,
        Err(e) => {
            error!(error = ?e, "failed to initialize application");
            return ExitCode::FAILURE;
        }
    };

    match app.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = ?e, "fatal server error");
            ExitCode::FAILURE
        }
    }
}
