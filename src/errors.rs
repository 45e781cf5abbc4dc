//! Error types for each pipeline stage.
//!
//! Network failures during extraction are represented by [`FetchError`] and
//! never leave the extractor; they are logged and the affected source or link
//! is skipped. [`LoadError`] and [`StepError`] surface to the runner, which
//! decides whether to retry.

use crate::models::RunReport;
use std::path::PathBuf;
use thiserror::Error;

/// Failure fetching a source homepage or a linked page.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("reading body from {url} failed: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    /// The URL that could not be fetched.
    pub fn url(&self) -> &str {
        match self {
            FetchError::Request { url, .. } | FetchError::Body { url, .. } => url,
        }
    }
}

/// Failure writing or reading the CSV output.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("creating directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("resolving output path {path}: {source}")]
    Resolve {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error on {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("flushing {path}: {source}")]
    Flush {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure of a runner step (load, snapshot or publish).
#[derive(Debug, Error)]
pub enum StepError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("building HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("failed to start `{program} {args}`: {source}")]
    Spawn {
        program: String,
        args: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{program} {args}` exited with code {code:?}: {stderr}")]
    Command {
        program: String,
        args: String,
        code: Option<i32>,
        stderr: String,
    },
}

/// A run that stopped at a failing step, with everything recorded up to it.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct RunFailure {
    pub report: RunReport,
    #[source]
    pub error: StepError,
}

/// Invalid or unreadable configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("at least one source URL is required")]
    NoSources,

    #[error("source {url:?} is not an absolute URL: {source}")]
    InvalidSource {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("{field} must be at least 1")]
    Zero { field: &'static str },
}
