//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// SurveyStats - per-question statistics for survey responses
///
/// Reads surveys, responses and answers from a SQLite database or a JSON
/// snapshot and reports answer counts and rating averages per question.
///
/// Examples:
///   surveystats --database surveys.db --survey 6f1c...
///   surveystats --snapshot export.json --survey s-feedback --format json
///   surveystats --database surveys.db --import export.json
///   surveystats --database surveys.db --list
///   surveystats --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Survey to report on
    #[arg(
        short,
        long,
        value_name = "ID",
        required_unless_present_any = ["init_config", "list", "import"]
    )]
    pub survey: Option<String>,

    /// SQLite database file
    ///
    /// Created on first use. Can also be set via SURVEYSTATS_DATABASE
    /// or the [storage] section of .surveystats.toml.
    #[arg(short, long, value_name = "FILE", env = "SURVEYSTATS_DATABASE")]
    pub database: Option<PathBuf>,

    /// JSON snapshot to read instead of a database (takes precedence)
    #[arg(long, value_name = "FILE")]
    pub snapshot: Option<PathBuf>,

    /// Import a JSON snapshot into the database and exit
    #[arg(long, value_name = "FILE", conflicts_with = "snapshot")]
    pub import: Option<PathBuf>,

    /// List surveys and exit
    #[arg(long, conflicts_with = "responses")]
    pub list: bool,

    /// List the survey's responses instead of its statistics
    #[arg(long)]
    pub responses: bool,

    /// Output file path (stdout when omitted)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Number of answer fetches in flight at once
    #[arg(long, value_name = "NUM")]
    pub concurrency: Option<usize>,

    /// Exit with code 2 when the survey does not exist
    ///
    /// Without this flag an unknown survey yields an empty report.
    #[arg(long)]
    pub require_survey: bool,

    /// Path to configuration file
    ///
    /// If not specified, looks for .surveystats.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .surveystats.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for reports.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if let Some(ref survey) = self.survey {
            if survey.trim().is_empty() {
                return Err("Survey id must not be empty".to_string());
            }
        }

        if self.responses && self.survey.is_none() {
            return Err("--responses requires --survey".to_string());
        }

        // Validate concurrency
        if self.concurrency == Some(0) {
            return Err("Concurrency must be at least 1".to_string());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref snapshot) = self.snapshot {
            if !snapshot.is_file() {
                return Err(format!("Snapshot file does not exist: {}", snapshot.display()));
            }
        }

        if let Some(ref import) = self.import {
            if !import.is_file() {
                return Err(format!("Import file does not exist: {}", import.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    ///
    /// `config_verbose` is the `[general] verbose` setting; `--quiet` wins over it.
    pub fn log_level(&self, config_verbose: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || config_verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
