//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::SimConfig;
use std::path::Path;

/// File name looked up by [`load_config`].
pub const CONFIG_FILE_NAME: &str = "kestrel.toml";

/// Loads and validates `kestrel.toml` from a directory.
pub fn load_config(dir: &Path) -> Result<SimConfig, ConfigError> {
    let content = std::fs::read_to_string(dir.join(CONFIG_FILE_NAME))?;
    load_config_from_str(&content)
}

/// Parses and validates a `kestrel.toml` configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<SimConfig, ConfigError> {
    let config: SimConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Rejects values the kernel cannot run with.
fn validate_config(config: &SimConfig) -> Result<(), ConfigError> {
    if config.settle.max_iterations == 0 {
        return Err(ConfigError::ValidationError(
            "settle.max_iterations must be positive".to_string(),
        ));
    }
    Ok(())
}
