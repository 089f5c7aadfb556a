//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.surveystats.toml` files.

use crate::cli::OutputFormat;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

/// Default configuration file name.
pub const CONFIG_FILE: &str = ".surveystats.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Statistics computation settings.
    #[serde(default)]
    pub stats: StatsConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Output file path. Reports go to stdout when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    /// Output format.
    #[serde(default)]
    pub format: OutputFormat,

    /// Enable verbose logging by default. `--quiet` still wins.
    #[serde(default)]
    pub verbose: bool,
}

/// Which storage collaborator to read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// SQLite database file
    #[default]
    Sqlite,
    /// JSON snapshot loaded into memory
    Snapshot,
}

/// Storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Backend kind.
    #[serde(default)]
    pub backend: StorageBackend,

    /// Database file or snapshot file path.
    #[serde(default = "default_database_path")]
    pub path: String,

    /// How long SQLite waits on a locked database, in milliseconds.
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            path: default_database_path(),
            busy_timeout_ms: default_busy_timeout(),
        }
    }
}

fn default_database_path() -> String {
    "surveys.db".to_string()
}

fn default_busy_timeout() -> u64 {
    5000
}

/// Statistics settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsConfig {
    /// Answer fetches in flight at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
        }
    }
}

fn default_concurrency() -> usize {
    4
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Show each label's share of the question's counted answers.
    #[serde(default = "default_true")]
    pub include_percentages: bool,

    /// List labels by descending count (true) or alphabetically (false).
    #[serde(default = "default_true")]
    pub sort_by_count: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            include_percentages: true,
            sort_by_count: true,
        }
    }
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref database) = args.database {
            if self.storage.backend == StorageBackend::Snapshot && args.snapshot.is_none() {
                warn!(
                    "Database {} (--database or SURVEYSTATS_DATABASE) replaces the configured snapshot {}",
                    database.display(),
                    self.storage.path
                );
            }
            self.storage.backend = StorageBackend::Sqlite;
            self.storage.path = database.display().to_string();
        }
        if let Some(ref snapshot) = args.snapshot {
            self.storage.backend = StorageBackend::Snapshot;
            self.storage.path = snapshot.display().to_string();
        }

        if let Some(format) = args.format {
            self.general.format = format;
        }
        if let Some(ref output) = args.output {
            self.general.output = Some(output.display().to_string());
        }

        if let Some(concurrency) = args.concurrency {
            self.stats.concurrency = concurrency;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::tests::make_args;
    use std::io::Write;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::FmtSubscriber;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
        assert_eq!(config.storage.path, "surveys.db");
        assert_eq!(config.stats.concurrency, 4);
        assert_eq!(config.general.format, OutputFormat::Markdown);
        assert!(config.general.output.is_none());
        assert!(config.report.include_percentages);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
output = "stats.json"
format = "json"
verbose = true

[storage]
backend = "snapshot"
path = "export.json"

[stats]
concurrency = 8

[report]
sort_by_count = false
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.output.as_deref(), Some("stats.json"));
        assert_eq!(config.general.format, OutputFormat::Json);
        assert!(config.general.verbose);
        assert_eq!(config.storage.backend, StorageBackend::Snapshot);
        assert_eq!(config.storage.path, "export.json");
        assert_eq!(config.storage.busy_timeout_ms, 5000);
        assert_eq!(config.stats.concurrency, 8);
        assert!(!config.report.sort_by_count);
        assert!(config.report.include_percentages);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[storage]"));
        assert!(toml_str.contains("[stats]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.storage.path, "surveys.db");
    }

    #[test]
    fn test_merge_explicit_args_only() {
        let mut config: Config = toml::from_str(
            r#"
[general]
format = "json"

[stats]
concurrency = 8
"#,
        )
        .unwrap();

        let args = make_args();
        config.merge_with_args(&args);
        assert_eq!(config.general.format, OutputFormat::Json);
        assert_eq!(config.stats.concurrency, 8);

        let mut args = make_args();
        args.snapshot = Some(PathBuf::from("dump.json"));
        args.concurrency = Some(2);
        args.format = Some(OutputFormat::Markdown);
        config.merge_with_args(&args);
        assert_eq!(config.storage.backend, StorageBackend::Snapshot);
        assert_eq!(config.storage.path, "dump.json");
        assert_eq!(config.stats.concurrency, 2);
        assert_eq!(config.general.format, OutputFormat::Markdown);
    }

    /// Log sink shared between a test and its subscriber.
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLogs {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    fn merge_capturing_logs(config: &mut Config, args: &crate::cli::Args) -> String {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = FmtSubscriber::builder()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        tracing::subscriber::with_default(subscriber, || config.merge_with_args(args));
        logs.text()
    }

    #[test]
    fn test_database_replacing_configured_snapshot_warns() {
        let mut config: Config = toml::from_str(
            r#"
[storage]
backend = "snapshot"
path = "export.json"
"#,
        )
        .unwrap();

        let mut args = make_args();
        args.database = Some(PathBuf::from("env.db"));
        let logs = merge_capturing_logs(&mut config, &args);

        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
        assert_eq!(config.storage.path, "env.db");
        assert!(logs.contains("WARN"));
        assert!(logs.contains("replaces the configured snapshot export.json"));
    }

    #[test]
    fn test_database_over_sqlite_config_is_silent() {
        let mut config = Config::default();
        let logs = merge_capturing_logs(&mut config, &make_args());

        assert_eq!(config.storage.path, "surveys.db");
        assert!(!logs.contains("WARN"));
    }

    #[test]
    fn test_verbose_flag_leaves_config_untouched() {
        let mut config = Config::default();
        let mut args = make_args();
        args.verbose = true;
        config.merge_with_args(&args);
        assert!(!config.general.verbose);
    }

    #[test]
    fn test_load_missing_file_fails() {
        assert!(Config::load(Path::new("/no/such/.surveystats.toml")).is_err());
    }
}
