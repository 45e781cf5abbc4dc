//! CSV output for the load stage.
//!
//! Rows are `id,title,description,href` with standard quoting, CRLF line
//! endings and no header. The target file is truncated and rewritten on every
//! run; history lives in the DVC snapshot, not here.

use crate::errors::LoadError;
use crate::models::Record;
use crate::utils::ensure_parent_dir;
use std::path::{Path, PathBuf};
use tracing::{error, info, instrument};

/// Write `records` to `path`, replacing any existing file.
///
/// # Returns
///
/// * `Ok(Some(path))` with the absolute path written
/// * `Ok(None)` when `records` is `None`; nothing is written and an error is logged
///
/// # Errors
///
/// Directory creation, path resolution, serialization and flush failures.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub fn write_records(records: Option<&[Record]>, path: &Path) -> Result<Option<PathBuf>, LoadError> {
    let Some(records) = records else {
        error!("No data to load");
        return Ok(None);
    };

    let absolute = std::path::absolute(path).map_err(|source| LoadError::Resolve {
        path: path.to_path_buf(),
        source,
    })?;

    ensure_parent_dir(&absolute).map_err(|source| LoadError::CreateDir {
        path: absolute.parent().map(Path::to_path_buf).unwrap_or_default(),
        source,
    })?;

    let csv_err = |source| LoadError::Csv {
        path: absolute.clone(),
        source,
    };

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::CRLF)
        .from_path(&absolute)
        .map_err(csv_err)?;

    for record in records {
        writer.serialize(record).map_err(csv_err)?;
    }
    writer.flush().map_err(|source| LoadError::Flush {
        path: absolute.clone(),
        source,
    })?;

    info!(path = %absolute.display(), rows = records.len(), "Data successfully saved");
    Ok(Some(absolute))
}

/// Read a file produced by [`write_records`].
#[cfg(test)]
#[instrument(level = "debug", skip_all, fields(path = %path.display()))]
pub fn read_records(path: &Path) -> Result<Vec<Record>, LoadError> {
    let csv_err = |source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(csv_err)?;

    reader
        .deserialize()
        .collect::<Result<Vec<Record>, _>>()
        .map_err(csv_err)
}
