//! Command-line interface definitions for the headline ETL job.
//!
//! Every flag is optional. Anything not given on the command line comes from
//! the YAML config file (if any) or the built-in defaults in
//! [`crate::config::PipelineConfig`].

use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for one invocation of the pipeline.
///
/// # Examples
///
/// ```sh
/// # One run with the default sources, writing ./output.csv
/// headline_etl
///
/// # Custom sources, no DVC or git steps
/// headline_etl -s https://www.dawn.com/ -o data/headlines.csv --skip-snapshot --skip-publish
///
/// # Keep running once a day
/// headline_etl --config headline_etl.yaml --daemon
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to a YAML config file
    #[arg(short, long, env = "HEADLINE_ETL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Source homepage to scrape (repeatable; replaces the configured list)
    #[arg(short, long = "source")]
    pub sources: Vec<String>,

    /// Output CSV path
    #[arg(short, long)]
    pub output_path: Option<PathBuf>,

    /// Concurrent link fetches per source
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Per-request HTTP timeout in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Git repository directory used by the publish step
    #[arg(long)]
    pub repo_dir: Option<PathBuf>,

    /// Do not run the DVC snapshot step
    #[arg(long)]
    pub skip_snapshot: bool,

    /// Do not run the git publish step
    #[arg(long)]
    pub skip_publish: bool,

    /// Repeat the run on the configured interval instead of exiting
    #[arg(long)]
    pub daemon: bool,

    /// Write a JSON run report to this path after each run, including failed ones
    #[arg(long)]
    pub report: Option<PathBuf>,
}
