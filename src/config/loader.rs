//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::WorkhorseConfig;
use crate::config::validation::ValidationError;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse configuration from a TOML file.
///
/// Semantic checks are left to [`validate_config`], run once command-line
/// overrides have been applied.
///
/// [`validate_config`]: crate::config::validation::validate_config
pub fn load_config(path: &Path) -> Result<WorkhorseConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: WorkhorseConfig = toml::from_str(&content)?;
    Ok(config)
}
