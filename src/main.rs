//! SurveyStats - per-question statistics for survey responses
//!
//! A CLI tool that reads surveys, responses and answers from a SQLite
//! database or a JSON snapshot and reports answer counts and rating
//! averages for each question of a survey.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (storage, config, I/O, etc.)
//!   2 - Survey not found under --require-survey

mod cli;
mod config;
mod models;
mod report;
mod stats;
mod store;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat};
use config::{Config, StorageBackend, CONFIG_FILE};
use models::{ReportMetadata, StatsReport};
use stats::StatsOptions;
use std::path::Path;
use std::time::{Duration, Instant};
use store::{open_store, Snapshot, SqliteStore, SurveyStore};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Load configuration before logging so the file can turn on verbose output
    let mut config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    init_logging(&args, &config);

    info!("SurveyStats v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    config.merge_with_args(&args);
    debug!("Effective configuration: {:?}", config);

    match run(args, config).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Run failed: {:#}", e);
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .surveystats.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "{} already exists. Remove it first or edit it manually.",
            CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("Created {} with default settings.", CONFIG_FILE);
    println!("Edit it to choose the storage backend, concurrency and report options.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
///
/// Logs go to stderr so that reports written to stdout stay clean.
fn init_logging(args: &Args, config: &Config) {
    let level = args.log_level(config.general.verbose);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Dispatch to the requested mode. Returns the process exit code.
async fn run(args: Args, config: Config) -> Result<i32> {
    if let Some(ref import_path) = args.import {
        return handle_import(&config, import_path).await;
    }

    let store = open_store(&config.storage).context("Failed to open survey store")?;

    if args.list {
        return handle_list(store.as_ref(), &config).await;
    }

    // Survey is required by clap outside of --init-config, --list and --import
    let Some(survey_id) = args.survey.as_deref() else {
        bail!("--survey is required");
    };

    if args.responses {
        return handle_responses(store.as_ref(), survey_id, &config).await;
    }

    handle_stats(store.as_ref(), survey_id, &args, &config).await
}

/// Handle --import: load a snapshot into the SQLite database.
async fn handle_import(config: &Config, import_path: &Path) -> Result<i32> {
    if config.storage.backend != StorageBackend::Sqlite {
        bail!("--import writes to a SQLite database; select one with --database");
    }

    let db_path = Path::new(&config.storage.path);
    info!(
        "Importing {} into {}",
        import_path.display(),
        db_path.display()
    );

    let store = SqliteStore::open(
        db_path,
        Duration::from_millis(config.storage.busy_timeout_ms),
    )
    .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    let snapshot = Snapshot::load(import_path)
        .with_context(|| format!("Failed to load snapshot {}", import_path.display()))?;

    let summary = store
        .import_snapshot(snapshot)
        .await
        .context("Import failed, database left unchanged")?;

    println!(
        "Imported {} surveys, {} questions, {} responses, {} answers into {}",
        summary.surveys,
        summary.questions,
        summary.responses,
        summary.answers,
        db_path.display()
    );

    Ok(0)
}

/// Handle --list: print every survey.
async fn handle_list(store: &dyn SurveyStore, config: &Config) -> Result<i32> {
    let surveys = store.list_surveys().await.context("Failed to list surveys")?;
    info!("Found {} surveys", surveys.len());

    let output = match config.general.format {
        OutputFormat::Json => report::generate_survey_list_json(&surveys)?,
        OutputFormat::Markdown => report::generate_survey_list_markdown(&surveys),
    };

    write_output(config, &output)?;
    Ok(0)
}

/// Handle --responses: print the survey's responses, newest first.
async fn handle_responses(store: &dyn SurveyStore, survey_id: &str, config: &Config) -> Result<i32> {
    let responses = store
        .list_responses(survey_id)
        .await
        .with_context(|| format!("Failed to list responses for survey {}", survey_id))?;
    info!("Found {} responses for {}", responses.len(), survey_id);

    let output = match config.general.format {
        OutputFormat::Json => report::generate_responses_json(&responses)?,
        OutputFormat::Markdown => report::generate_responses_markdown(survey_id, &responses),
    };

    write_output(config, &output)?;
    Ok(0)
}

/// Compute and render the survey's statistics. Returns 2 when the survey
/// is missing and --require-survey was given.
async fn handle_stats(
    store: &dyn SurveyStore,
    survey_id: &str,
    args: &Args,
    config: &Config,
) -> Result<i32> {
    let start_time = Instant::now();

    let survey = store
        .find_survey(survey_id)
        .await
        .with_context(|| format!("Failed to look up survey {}", survey_id))?;

    if survey.is_none() {
        if args.require_survey {
            eprintln!("Survey not found: {}", survey_id);
            return Ok(2);
        }
        warn!("Survey {} not found, reporting empty statistics", survey_id);
    }

    let options = StatsOptions::from(&config.stats);
    let stats = stats::survey_stats(store, survey_id, &options)
        .await
        .with_context(|| format!("Failed to compute statistics for survey {}", survey_id))?;

    let duration = start_time.elapsed().as_secs_f64();
    info!(
        "Computed {} question stats over {} responses in {:.2}s",
        stats.question_stats.len(),
        stats.total_responses,
        duration
    );

    let output = match config.general.format {
        OutputFormat::Json => report::generate_json_report(&stats)?,
        OutputFormat::Markdown => {
            let report = StatsReport {
                metadata: ReportMetadata {
                    backend: store.backend_tag().to_string(),
                    generated_at: Utc::now(),
                    duration_seconds: duration,
                },
                survey,
                stats,
            };
            report::generate_markdown_report(&report, &config.report)
        }
    };

    write_output(config, &output)?;
    Ok(0)
}

/// Write a rendered report to the configured output file, or stdout.
fn write_output(config: &Config, output: &str) -> Result<()> {
    match config.general.output {
        Some(ref path) => {
            std::fs::write(path, output)
                .with_context(|| format!("Failed to write report to {}", path))?;
            info!("Report saved to: {}", path);
        }
        None => println!("{}", output),
    }
    Ok(())
}

/// Load configuration from file or use defaults.
///
/// Runs before logging is set up, so problems are reported on stderr.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok(config),
        Ok(None) => Ok(Config::default()),
        Err(e) => {
            eprintln!("Warning: {:#}. Using default settings.", e);
            Ok(Config::default())
        }
    }
}
