//! Configuration schema definitions.
//!
//! All types derive Serde traits so the same structures can be built from the
//! command line or read from a file.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::ppd::DocumentFormat;

/// Root configuration for the print server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Listener configuration (host, port).
    #[serde(default)]
    pub listener: ListenerConfig,

    /// Identity advertised to IPP clients.
    #[serde(default)]
    pub printer: PrinterConfig,

    /// What happens to accepted print jobs.
    pub behaviour: BehaviourConfig,

    /// Logging and metrics settings.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Host name or address to listen on.
    pub host: String,

    pub port: u16,
}

impl ListenerConfig {
    /// `host:port`, suitable for `TcpListener::bind`.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 631,
        }
    }
}

/// Printer identity.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PrinterConfig {
    pub name: String,
    pub info: String,
    pub make_and_model: String,

    /// Format requested from clients (PostScript unless `--pdf`).
    pub format: DocumentFormat,
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self {
            name: "ipp-server".to_string(),
            info: "Printer using ipp-server".to_string(),
            make_and_model: format!("ipp-server {}", env!("CARGO_PKG_VERSION")),
            format: DocumentFormat::Postscript,
        }
    }
}

/// The behaviour selected at startup.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum BehaviourConfig {
    SaveToDisk {
        directory: PathBuf,
    },
    RunCommand {
        program: String,
        #[serde(default)]
        args: Vec<String>,
    },
    SaveAndRunCommand {
        directory: PathBuf,
        program: String,
        #[serde(default)]
        args: Vec<String>,
    },
    PostToRemoteService {
        postage: PostageConfig,
    },
    RejectAll,
}

impl BehaviourConfig {
    /// Name used in startup logs.
    pub fn name(&self) -> &'static str {
        match self {
            BehaviourConfig::SaveToDisk { .. } => "save",
            BehaviourConfig::RunCommand { .. } => "run",
            BehaviourConfig::SaveAndRunCommand { .. } => "saveandrun",
            BehaviourConfig::PostToRemoteService { .. } => "postage",
            BehaviourConfig::RejectAll => "reject",
        }
    }
}

/// Remote letter posting service settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct PostageConfig {
    /// Base URL of the JSON API.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    pub username: String,
    pub password: String,

    /// Where letters are sent.
    pub recipient: Recipient,

    /// Service option codes.
    #[serde(default)]
    pub postage: u32,
    #[serde(default)]
    pub paper: u32,
    #[serde(default)]
    pub envelope: u32,
    #[serde(default)]
    pub extras: u32,
}

fn default_api_url() -> String {
    "https://www.pc2paper.co.uk/lettercustomerapi.svc/json".to_string()
}

/// Postal address of the letter recipient.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Recipient {
    pub name: String,

    /// Up to four address lines; extra lines are ignored.
    pub address_lines: Vec<String>,

    pub postcode: String,

    /// Service country code.
    pub country: u32,
}

/// Observability configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Number of `-v` flags: 0 = info, 1 = debug, 2+ = trace.
    pub verbosity: u8,

    /// Prometheus scrape endpoint, disabled when absent.
    pub metrics_address: Option<SocketAddr>,
}
