//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::EngineConfig;
use std::path::Path;

/// File name looked up by [`load_config`].
pub const CONFIG_FILE_NAME: &str = "verba.toml";

/// Loads and validates a `verba.toml` configuration from a directory.
///
/// Reads `<dir>/verba.toml`, parses it, and validates its values.
pub fn load_config(dir: &Path) -> Result<EngineConfig, ConfigError> {
    let config_path = dir.join(CONFIG_FILE_NAME);
    let content = std::fs::read_to_string(&config_path)?;
    load_config_from_str(&content)
}

/// Parses and validates a `verba.toml` configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<EngineConfig, ConfigError> {
    let config: EngineConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Rejects limits that would make every compile or parse fail.
fn validate_config(config: &EngineConfig) -> Result<(), ConfigError> {
    if config.expansion.max_depth == 0 {
        return Err(ConfigError::ValidationError(
            "expansion.max_depth must be positive".to_string(),
        ));
    }
    if config.traversal.max_repeat == 0 {
        return Err(ConfigError::ValidationError(
            "traversal.max_repeat must be positive".to_string(),
        ));
    }
    Ok(())
}
