//! Command-line interface.
//!
//! # Responsibilities
//! - Parse host, port, verbosity and the action selecting a behaviour
//! - Turn the parsed arguments into a `ServerConfig`
//!
//! # Design Decisions
//! - `-H` is the host flag so `-h` stays help
//! - Commands are taken verbatim after the action's own options, hyphens
//!   included

use clap::{ArgAction, Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::config::{
    load_postage_config, BehaviourConfig, ConfigError, ListenerConfig, ObservabilityConfig,
    PrinterConfig, ServerConfig,
};
use crate::ppd::DocumentFormat;

#[derive(Debug, Parser)]
#[command(name = "ipp-server")]
#[command(version, about = "A small IPP print server", long_about = None)]
pub struct Cli {
    /// Increase log detail (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Address to listen on
    #[arg(short = 'H', long, default_value = "localhost")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long)]
    pub port: u16,

    /// Serve Prometheus metrics on this address
    #[arg(long)]
    pub metrics_address: Option<SocketAddr>,

    #[command(subcommand)]
    pub action: Action,
}

/// Document format selection shared by the accepting actions.
#[derive(Debug, Clone, Copy, Args)]
pub struct FormatArgs {
    /// Ask clients for PDF instead of PostScript
    #[arg(long)]
    pub pdf: bool,
}

impl FormatArgs {
    fn format(self) -> DocumentFormat {
        if self.pdf {
            DocumentFormat::Pdf
        } else {
            DocumentFormat::Postscript
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Action {
    /// Write each print job to a new file in DIRECTORY
    Save {
        #[command(flatten)]
        format: FormatArgs,
        directory: PathBuf,
    },

    /// Run COMMAND for each print job, with the document on stdin
    Run {
        #[command(flatten)]
        format: FormatArgs,
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Save each print job to DIRECTORY, then run COMMAND with the file name
    /// as its last argument
    #[command(name = "saveandrun")]
    SaveAndRun {
        #[command(flatten)]
        format: FormatArgs,
        directory: PathBuf,
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Reject every print job
    Reject,

    /// Post each print job as a letter through a postage service
    #[command(alias = "pc2paper")]
    Postage {
        #[command(flatten)]
        format: FormatArgs,
        /// Service configuration (JSON or TOML)
        #[arg(long)]
        config: PathBuf,
    },
}

impl Cli {
    /// Build the server configuration, loading any referenced files.
    pub fn into_config(self) -> Result<ServerConfig, ConfigError> {
        let (behaviour, format) = match self.action {
            Action::Save { format, directory } => {
                (BehaviourConfig::SaveToDisk { directory }, format.format())
            }
            Action::Run { format, command } => {
                let (program, args) = split_command(command);
                (BehaviourConfig::RunCommand { program, args }, format.format())
            }
            Action::SaveAndRun {
                format,
                directory,
                command,
            } => {
                let (program, args) = split_command(command);
                (
                    BehaviourConfig::SaveAndRunCommand {
                        directory,
                        program,
                        args,
                    },
                    format.format(),
                )
            }
            Action::Reject => (BehaviourConfig::RejectAll, DocumentFormat::Postscript),
            Action::Postage { format, config } => {
                let postage = load_postage_config(&config)?;
                (
                    BehaviourConfig::PostToRemoteService { postage },
                    format.format(),
                )
            }
        };

        Ok(ServerConfig {
            listener: ListenerConfig {
                host: self.host,
                port: self.port,
            },
            printer: PrinterConfig {
                format,
                ..PrinterConfig::default()
            },
            behaviour,
            observability: ObservabilityConfig {
                verbosity: self.verbose,
                metrics_address: self.metrics_address,
            },
        })
    }
}

/// An empty command yields an empty program, which validation rejects.
fn split_command(command: Vec<String>) -> (String, Vec<String>) {
    let mut parts = command.into_iter();
    let program = parts.next().unwrap_or_default();
    (program, parts.collect())
}
