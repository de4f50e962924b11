use clap::{Parser, ValueEnum};

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "repowatch", about = "GitHub repository search poller")]
pub struct Args {
    /// Log output format.
    #[arg(long, value_enum, default_value_t = TracingFormat::Pretty)]
    pub tracing: TracingFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TracingFormat {
    Pretty,
    Json,
}
