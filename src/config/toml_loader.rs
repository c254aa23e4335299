//! TOML attribute file parsing.
use std::path::Path;

use crate::error::ConfigError;

/// Load a TOML file as a raw table.
///
/// A missing file yields an empty table so callers fall back to defaults.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_table(path: &Path) -> Result<toml::Table, ConfigError> {
    if !path.exists() {
        tracing::debug!("attribute file {} not found, using defaults", path.display());
        return Ok(toml::Table::new());
    }

    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;

    content
        .parse::<toml::Table>()
        .map_err(|e| ConfigError::InvalidSyntax {
            file: path.display().to_string(),
            message: e.message().to_string(),
        })
}
