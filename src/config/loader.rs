//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::PostageConfig;
use crate::config::validation::{validate_postage, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Toml(toml::de::Error),
    Json(serde_json::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Toml(e) => write!(f, "Parse error: {}", e),
            ConfigError::Json(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load and validate the postage service configuration.
///
/// Files ending in `.json` are read as JSON, anything else as TOML.
pub fn load_postage_config(path: &Path) -> Result<PostageConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let config: PostageConfig = if is_json {
        serde_json::from_str(&content).map_err(ConfigError::Json)?
    } else {
        toml::from_str(&content).map_err(ConfigError::Toml)?
    };

    validate_postage(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}
