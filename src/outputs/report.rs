//! JSON run report, written after each run when `--report` is given.

use crate::models::RunReport;
use std::io;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Serialize `report` as pretty JSON to `path`, replacing any previous file.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_report(path: &Path, report: &RunReport) -> io::Result<()> {
    let json = serde_json::to_string_pretty(report).map_err(io::Error::other)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, json).await?;
    info!("Wrote run report");
    Ok(())
}
