//! Pipeline configuration.
//!
//! Configuration is an explicit [`PipelineConfig`] value handed to the runner.
//! It is built from built-in defaults, optionally replaced by a YAML file, and
//! finally overridden by command-line flags (see [`crate::cli::Cli`]).
//!
//! ```yaml
//! sources:
//!   - https://www.dawn.com/
//!   - https://www.bbc.com/
//! output_path: output.csv
//! worker_pool_size: 10
//! request_timeout_secs: 30
//! snapshot:
//!   enabled: true
//! publish:
//!   repo_dir: /srv/headlines
//!   branch: main
//! schedule:
//!   retries: 1
//!   retry_delay_secs: 300
//! ```

use crate::cli::Cli;
use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, instrument};
use url::Url;

/// Homepages scraped when no sources are configured.
pub const DEFAULT_SOURCES: [&str; 2] = ["https://www.dawn.com/", "https://www.bbc.com/"];

/// Top-level configuration for a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Homepages to discover links from, processed in order.
    pub sources: Vec<String>,
    /// CSV destination; relative paths resolve against the working directory.
    pub output_path: PathBuf,
    /// Concurrent link fetches per source.
    pub worker_pool_size: usize,
    /// Per-request timeout for every HTTP fetch.
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub snapshot: SnapshotConfig,
    pub publish: PublishConfig,
    pub schedule: ScheduleConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sources: DEFAULT_SOURCES.iter().map(|s| s.to_string()).collect(),
            output_path: PathBuf::from("output.csv"),
            worker_pool_size: 10,
            request_timeout_secs: 30,
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
            snapshot: SnapshotConfig::default(),
            publish: PublishConfig::default(),
            schedule: ScheduleConfig::default(),
        }
    }
}

/// DVC registration of the output file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    pub enabled: bool,
    pub program: String,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            program: "dvc".to_string(),
        }
    }
}

/// Git commit and push of the DVC tracking files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    pub enabled: bool,
    pub program: String,
    /// Repository root; defaults to the output file's directory.
    pub repo_dir: Option<PathBuf>,
    /// Files staged before committing. Empty means `.dvc/config`,
    /// `<output>.dvc` and `.gitignore`.
    pub tracked_files: Vec<String>,
    pub remote: String,
    pub branch: String,
    pub commit_message: String,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            program: "git".to_string(),
            repo_dir: None,
            tracked_files: Vec::new(),
            remote: "origin".to_string(),
            branch: "main".to_string(),
            commit_message: "Add DVC files".to_string(),
        }
    }
}

/// Retry and cadence settings for the runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Extra attempts after a failing step.
    pub retries: usize,
    pub retry_delay_secs: u64,
    /// Time between run starts in daemon mode.
    pub interval_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            retries: 1,
            retry_delay_secs: 5 * 60,
            interval_secs: 24 * 60 * 60,
        }
    }
}

impl ScheduleConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl PipelineConfig {
    /// Read a YAML configuration file. Missing keys fall back to defaults.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!(sources = config.sources.len(), "Loaded configuration file");
        Ok(config)
    }

    /// Build the effective configuration: file (or defaults), then CLI overrides.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let mut config = match &cli.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_cli(cli);
        config.validate()?;
        debug!(?config, "Effective configuration");
        Ok(config)
    }

    /// Overlay any flags given on the command line.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if !cli.sources.is_empty() {
            self.sources = cli.sources.clone();
        }
        if let Some(path) = &cli.output_path {
            self.output_path = path.clone();
        }
        if let Some(workers) = cli.workers {
            self.worker_pool_size = workers;
        }
        if let Some(secs) = cli.timeout_secs {
            self.request_timeout_secs = secs;
        }
        if let Some(dir) = &cli.repo_dir {
            self.publish.repo_dir = Some(dir.clone());
        }
        if cli.skip_snapshot {
            self.snapshot.enabled = false;
        }
        if cli.skip_publish {
            self.publish.enabled = false;
        }
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sources.is_empty() {
            return Err(ConfigError::NoSources);
        }
        for source in &self.sources {
            Url::parse(source).map_err(|e| ConfigError::InvalidSource {
                url: source.clone(),
                source: e,
            })?;
        }
        if self.worker_pool_size == 0 {
            return Err(ConfigError::Zero {
                field: "worker_pool_size",
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Zero {
                field: "request_timeout_secs",
            });
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Directory holding the output file; `.` for a bare file name.
    pub fn output_dir(&self) -> PathBuf {
        match self.output_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// File name of the output, as passed to `dvc add`.
    pub fn output_file_name(&self) -> String {
        self.output_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output.csv".to_string())
    }

    pub fn repo_dir(&self) -> PathBuf {
        self.publish
            .repo_dir
            .clone()
            .unwrap_or_else(|| self.output_dir())
    }

    /// Files staged by the publish step.
    pub fn tracked_files(&self) -> Vec<String> {
        if !self.publish.tracked_files.is_empty() {
            return self.publish.tracked_files.clone();
        }
        vec![
            ".dvc/config".to_string(),
            format!("{}.dvc", self.output_file_name()),
            ".gitignore".to_string(),
        ]
    }
}
