//! Filesystem locations for jobdeck state.

use std::path::PathBuf;

use crate::error::{JobdeckError, JobdeckResult};

pub fn config_dir() -> JobdeckResult<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or_else(|| JobdeckError::Config("Could not determine config directory".to_string()))?
        .join("jobdeck"))
}

pub fn data_dir() -> JobdeckResult<PathBuf> {
    Ok(dirs::data_dir()
        .ok_or_else(|| JobdeckError::Config("Could not determine data directory".to_string()))?
        .join("jobdeck"))
}

/// Path to the jobdeck database. `JOBDECK_DB` overrides the default
/// location (useful for the embedding UI shell and for scripting).
pub fn db_path() -> JobdeckResult<PathBuf> {
    if let Ok(path) = std::env::var("JOBDECK_DB") {
        return Ok(PathBuf::from(path));
    }
    Ok(data_dir()?.join("jobdeck.db"))
}
