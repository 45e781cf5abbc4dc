//! # Headline ETL
//!
//! A daily batch job that scrapes headline links from news homepages,
//! extracts each linked page's title and meta description, drops incomplete
//! records, writes the rest to a CSV file, and versions that file with DVC
//! and git.
//!
//! ## Usage
//!
//! ```sh
//! headline_etl -o ./output.csv
//! headline_etl --config headline_etl.yaml --daemon
//! ```
//!
//! ## Architecture
//!
//! The run is a linear pipeline:
//! 1. **Extract**: index each source homepage, then fetch every link (10 at a time)
//! 2. **Transform**: keep records with both a title and a description
//! 3. **Load**: overwrite the CSV output
//! 4. **Snapshot**: `dvc add` / `dvc commit` / `dvc push` the output
//! 5. **Publish**: commit and push the DVC tracking files with git

use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod errors;
mod models;
mod outputs;
mod pipeline;
mod retry;
mod scrapers;
mod transform;
mod utils;
mod versioning;

use cli::Cli;
use config::PipelineConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "headline_etl starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let config = match PipelineConfig::load(&args) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };
    info!(
        sources = ?config.sources,
        output_path = %config.output_path.display(),
        workers = config.worker_pool_size,
        "Configuration loaded"
    );

    if args.daemon {
        pipeline::run_forever(&config, args.report.as_deref()).await;
        return Ok(());
    }

    let (report, failure) = match pipeline::run_once(&config).await {
        Ok(report) => (report, None),
        Err(failure) => (failure.report, Some(failure.error)),
    };

    if let Some(path) = &args.report {
        outputs::report::write_report(path, &report).await?;
    }

    if let Some(e) = failure {
        error!(error = %e, "Pipeline run failed");
        return Err(e.into());
    }

    info!(
        extracted = report.extracted,
        kept = report.kept,
        elapsed_ms = report.elapsed_ms,
        "Execution complete"
    );
    Ok(())
}
