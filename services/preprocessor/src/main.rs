//! Cyclone dataset preprocessor.
//!
//! Runs one preprocessing stage, or all of them in order, over the years
//! and months named in the configuration file.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use preprocessor::{run_stage, PreprocessorConfig, Stage, StageContext};
use storage::ObjectStorage;

#[derive(Parser, Debug)]
#[command(name = "preprocessor")]
#[command(about = "Cyclone dataset preprocessing")]
struct Args {
    /// Configuration file path
    #[arg(short, long, env = "PREPROCESSOR_CONFIG", default_value = "/etc/preprocessor/config.yaml")]
    config: String,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log format
    #[arg(long, value_enum, default_value = "json")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum LogFormat {
    Json,
    Pretty,
}

#[derive(ClapArgs, Debug, Clone, Copy)]
struct Scope {
    /// Only this year
    #[arg(long)]
    year: Option<i32>,

    /// Only this month
    #[arg(long)]
    month: Option<u32>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Raw reanalysis days into day arrays
    Restructure(Scope),
    /// Day arrays into months
    Combine(Scope),
    /// Track table into target maps
    Targets(Scope),
    /// Months into chunked year stores
    Dataset(Scope),
    /// Every stage in order
    All(Scope),
}

impl Command {
    fn plan(&self) -> (Vec<Stage>, Scope) {
        match *self {
            Command::Restructure(s) => (vec![Stage::Restructure], s),
            Command::Combine(s) => (vec![Stage::Combine], s),
            Command::Targets(s) => (vec![Stage::Targets], s),
            Command::Dataset(s) => (vec![Stage::Dataset], s),
            Command::All(s) => (Stage::ALL.to_vec(), s),
        }
    }
}

fn init_tracing(args: &Args) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    let builder = fmt().with_env_filter(filter).with_target(true).with_level(true);
    match args.log_format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.pretty().init(),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(&args);

    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!(error = %format!("{:#}", e), "Preprocessor failed");
            ExitCode::FAILURE
        }
    }
}

/// Run the selected stages; `Ok(false)` when any unit failed.
async fn run(args: Args) -> Result<bool> {
    let (stages, scope) = args.command.plan();

    let mut config = PreprocessorConfig::load(&args.config)?;
    config
        .narrow(scope.year, scope.month)
        .context("Invalid --year/--month")?;
    info!(
        storage = %config.storage.describe(),
        years = ?config.years,
        months = ?config.months,
        workers = config.workers,
        "Loaded configuration"
    );

    let store = ObjectStorage::new(&config.storage)?;
    let ctx = StageContext::new(config, Arc::new(store));

    for stage in stages {
        let report = run_stage(&ctx, stage).await?;
        if !report.is_success() {
            for failure in report.failures() {
                error!(
                    stage = stage.name(),
                    unit = %failure.unit,
                    error = failure.result.as_ref().err().map(String::as_str).unwrap_or_default(),
                    "Unit failed"
                );
            }
            // Later stages read what this one writes.
            error!(stage = stage.name(), failed = report.failed(), "Stopping");
            return Ok(false);
        }
    }

    info!("All stages complete");
    Ok(true)
}
