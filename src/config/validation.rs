//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check that output directories exist and commands are non-empty
//! - Check postage credentials, recipient and API URL
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is a pure function of the config plus filesystem lookups
//! - Runs before the listener is bound

use thiserror::Error;
use url::Url;

use crate::config::schema::{BehaviourConfig, PostageConfig, ServerConfig};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Validate the whole server configuration.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.host.trim().is_empty() {
        errors.push(ValidationError::new("listener.host", "must not be empty"));
    }

    match &config.behaviour {
        BehaviourConfig::SaveToDisk { directory } => {
            if !directory.is_dir() {
                errors.push(ValidationError::new(
                    "directory",
                    format!("{} is not a directory", directory.display()),
                ));
            }
        }
        BehaviourConfig::RunCommand { program, .. } => {
            if program.trim().is_empty() {
                errors.push(ValidationError::new("command", "must not be empty"));
            }
        }
        BehaviourConfig::SaveAndRunCommand {
            directory, program, ..
        } => {
            if !directory.is_dir() {
                errors.push(ValidationError::new(
                    "directory",
                    format!("{} is not a directory", directory.display()),
                ));
            }
            if program.trim().is_empty() {
                errors.push(ValidationError::new("command", "must not be empty"));
            }
        }
        BehaviourConfig::PostToRemoteService { postage } => {
            if let Err(mut postage_errors) = validate_postage(postage) {
                errors.append(&mut postage_errors);
            }
        }
        BehaviourConfig::RejectAll => {}
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate the postage service configuration.
pub fn validate_postage(config: &PostageConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match Url::parse(&config.api_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => errors.push(ValidationError::new(
            "api_url",
            format!("unsupported scheme {:?}", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new("api_url", e.to_string())),
    }
    if config.username.is_empty() {
        errors.push(ValidationError::new("username", "must not be empty"));
    }
    if config.password.is_empty() {
        errors.push(ValidationError::new("password", "must not be empty"));
    }
    if config.recipient.name.trim().is_empty() {
        errors.push(ValidationError::new("recipient.name", "must not be empty"));
    }
    if config.recipient.address_lines.is_empty() {
        errors.push(ValidationError::new(
            "recipient.address_lines",
            "at least one line is required",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
