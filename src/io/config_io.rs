use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::io::{atomic_write_string, IoError};
use crate::state::options::GridConfig;

/// `data.json` → `data.grid.json`; a path without extension gets `.grid.json` appended.
pub fn sidecar_path_for(data_path: &Path) -> PathBuf {
    let mut name: OsString = data_path
        .file_stem()
        .map(OsString::from)
        .unwrap_or_default();
    name.push(".grid.json");
    data_path.with_file_name(name)
}

/// Missing file → defaults.
pub fn load_config(path: &Path) -> Result<GridConfig, IoError> {
    if !path.exists() {
        debug!(path = %path.display(), "no grid config, using defaults");
        return Ok(GridConfig::default());
    }
    let content = fs::read_to_string(path).map_err(|e| IoError::io(path, e))?;
    let config = serde_json::from_str(&content).map_err(|source| IoError::InvalidConfig {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), "grid config loaded");
    Ok(config)
}

pub fn load_sidecar(data_path: &Path) -> Result<GridConfig, IoError> {
    load_config(&sidecar_path_for(data_path))
}

pub fn save_config(path: &Path, config: &GridConfig) -> Result<(), IoError> {
    let content = serde_json::to_string_pretty(config)?;
    atomic_write_string(path, &content).map_err(|e| IoError::io(path, e))
}

pub fn save_sidecar(data_path: &Path, config: &GridConfig) -> Result<(), IoError> {
    save_config(&sidecar_path_for(data_path), config)
}
