//! Startup orchestration.
//!
//! # Responsibilities
//! - Validate configuration
//! - Install the metrics exporter when configured
//! - Build the behaviour and start the server
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - The listener binds last, so traffic only arrives once everything else
//!   is ready

use metrics_exporter_prometheus::BuildError;
use thiserror::Error;

use crate::behaviour;
use crate::config::{validate_config, ServerConfig, ValidationError};
use crate::observability::metrics::init_metrics;
use crate::server::{Server, ServerError};

/// Error type for startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {}", join(.0))]
    Validation(Vec<ValidationError>),

    #[error("failed to install metrics exporter: {0}")]
    Metrics(#[from] BuildError),

    #[error(transparent)]
    Server(#[from] ServerError),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Validate `config`, build its behaviour and start serving.
pub async fn start(config: &ServerConfig) -> Result<Server, StartupError> {
    validate_config(config).map_err(StartupError::Validation)?;

    if let Some(addr) = config.observability.metrics_address {
        init_metrics(addr)?;
    }

    let behaviour = behaviour::build(config);
    tracing::info!(
        behaviour = config.behaviour.name(),
        format = ?config.printer.format,
        "Behaviour configured"
    );

    let server = Server::start(&config.listener.address(), behaviour).await?;
    Ok(server)
}
