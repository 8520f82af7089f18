//! Job execution stats service - Entry Point
//!
//! `serve` (default): HTTP API and metrics until ctrl-c
//! `stats`: print the trailing window as JSON
//! `record`: count one execution outcome

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

/// Per-day job execution statistics
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via JOBSTATS_CONFIG env var)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP API
    Serve,
    /// Print per-day counts for the trailing window
    Stats {
        /// Window length in days (defaults to the dashboard default window)
        #[arg(short, long, allow_negative_numbers = true)]
        days: Option<i64>,
        /// Print every persisted day instead of a window
        #[arg(long, conflicts_with = "days")]
        all: bool,
    },
    /// Record one completed execution
    Record {
        /// Job name
        #[arg(short, long)]
        job: String,
        /// Count the execution as failed
        #[arg(long)]
        failed: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = jobstats_server::AppConfig::resolve_path(args.config);
    let config = jobstats_server::AppConfig::load(&config_path)?;

    jobstats_telemetry::init_logging(&config.telemetry.log_level)?;
    info!(
        config_path = %config_path,
        "Starting jobstats v{}",
        env!("CARGO_PKG_VERSION")
    );

    let app = jobstats_server::Application::new(config)?;

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => app.run().await?,
        Command::Stats { days, all } => {
            let window = if all {
                app.all_stats().await?
            } else {
                let days = days.unwrap_or(app.config().dashboard.default_window_days);
                app.stats_window(days).await?
            };
            println!("{}", serde_json::to_string_pretty(&window)?);
            app.close()?;
        }
        Command::Record { job, failed } => {
            let report = app.record(&job, !failed).await?;
            info!(
                job_name = %report.job_name,
                day = %report.day,
                metrics_ok = report.metrics.is_ok(),
                "Execution recorded"
            );
            app.close()?;
            report.into_result()?;
        }
    }

    Ok(())
}
