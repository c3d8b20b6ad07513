//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber
//! - Map `-v` counts onto a default filter
//!
//! # Design Decisions
//! - `RUST_LOG` wins over the verbosity flag when set
//! - Human-readable fmt output on stderr

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter directive for a verbosity level.
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "ipp_server=info",
        1 => "ipp_server=debug",
        _ => "ipp_server=trace",
    }
}

/// Install the global subscriber. Call once, before anything logs.
pub fn init_logging(verbosity: u8) {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_directive(verbosity).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
