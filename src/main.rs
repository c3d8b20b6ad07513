//! IPP print server binary.
//!
//! ```text
//!     Client ──GET──▶ ┌──────────┐     ┌────────────┐
//!                     │ listener │ ──▶ │ dispatcher │ ──▶ homepage / PPD / 404
//!     Client ──POST─▶ └──────────┘     └─────┬──────┘
//!                                            │ IPP
//!                                            ▼
//!                                      ┌───────────┐
//!                                      │ behaviour │ ──▶ file / command / letter
//!                                      └───────────┘
//! ```

use clap::Parser;

use ipp_server::cli::Cli;
use ipp_server::lifecycle;
use ipp_server::observability::logging::init_logging;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "ipp-server starting");

    let config = cli.into_config()?;
    let server = lifecycle::start(&config).await?;

    tracing::info!(
        address = %server.local_addr(),
        "Listening for connections"
    );

    server.run_until_interrupted().await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
