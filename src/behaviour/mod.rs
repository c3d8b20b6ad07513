//! Pluggable printer behaviour.
//!
//! # Data Flow
//! ```text
//! decoded IppMessage
//!     → Behaviour::expects_page_data (decides 100 Continue vs 200 OK)
//!     → Behaviour::handle
//!         printer.rs  (IPP operations shared by every printer)
//!         reject.rs   (answers print jobs with job-canceled-at-device)
//!         save.rs / command.rs / postage.rs (DocumentSink for accepted jobs)
//!     → response IppMessage
//! ```
//!
//! # Design Decisions
//! - One Behaviour is built at startup and shared by every connection
//! - Implementations are `Send + Sync` and synchronise internally; the
//!   dispatcher never locks around them
//! - Document handling is a separate `DocumentSink` seam so the IPP operation
//!   table is written once

pub mod command;
pub mod postage;
pub mod printer;
pub mod reject;
pub mod save;

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::io;
use std::process::ExitStatus;
use std::sync::Arc;
use thiserror::Error;

use crate::config::{BehaviourConfig, ServerConfig};
use crate::ipp::{IppMessage, Operation};

pub use command::{RunCommand, SaveAndRunCommand};
pub use postage::{PostToRemoteService, PostageClient};
pub use printer::{Printer, StatelessPrinter};
pub use reject::RejectAll;
pub use save::SaveToDisk;

/// Failures raised while a behaviour handles a request.
#[derive(Debug, Error)]
pub enum BehaviourError {
    #[error("{0} requires page data but none was received")]
    MissingPageData(Operation),

    #[error("operation id 0x0d0a suggests an HTTP request was sent as IPP")]
    MisidentifiedHttp,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to start {command:?}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("{command:?} exited with {status}")]
    CommandFailed { command: String, status: ExitStatus },

    #[error("remote service request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("remote service refused the job: {0}")]
    RemoteService(String),
}

/// Printer logic shared by all connections.
#[async_trait]
pub trait Behaviour: Send + Sync {
    /// Whether page data follows the IPP request on this connection.
    fn expects_page_data(&self, request: &IppMessage) -> bool;

    /// Produce the IPP response for `request`.
    async fn handle(
        &self,
        request: &IppMessage,
        page_data: Option<Bytes>,
    ) -> Result<IppMessage, BehaviourError>;

    /// PPD document describing this printer.
    fn ppd_document(&self) -> String;
}

/// Metadata of an accepted print job handed to a [`DocumentSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: u32,
    pub name: Option<String>,
    pub user: Option<String>,
    pub document_format: Option<String>,
    /// Extension used when the document is written to a file.
    pub extension: &'static str,
}

impl Job {
    /// `IPP_*` environment variables describing the job.
    pub fn environment(&self) -> HashMap<String, String> {
        let mut env = HashMap::new();
        env.insert("IPP_JOB_ID".to_string(), self.id.to_string());
        if let Some(name) = &self.name {
            env.insert("IPP_JOB_NAME".to_string(), name.clone());
        }
        if let Some(user) = &self.user {
            env.insert("IPP_REQUESTING_USER_NAME".to_string(), user.clone());
        }
        if let Some(format) = &self.document_format {
            env.insert("IPP_DOCUMENT_FORMAT".to_string(), format.clone());
        }
        env
    }
}

/// Destination for the document of an accepted print job.
#[async_trait]
pub trait DocumentSink: Send + Sync {
    async fn accept(&self, job: &Job, document: Bytes) -> Result<(), BehaviourError>;
}

/// Build the behaviour selected by `config`.
pub fn build(config: &ServerConfig) -> Arc<dyn Behaviour> {
    let printer = Printer::new(&config.printer, &config.listener);
    match &config.behaviour {
        BehaviourConfig::SaveToDisk { directory } => {
            Arc::new(StatelessPrinter::new(printer, SaveToDisk::new(directory)))
        }
        BehaviourConfig::RunCommand { program, args } => Arc::new(StatelessPrinter::new(
            printer,
            RunCommand::new(program.clone(), args.clone()),
        )),
        BehaviourConfig::SaveAndRunCommand {
            directory,
            program,
            args,
        } => Arc::new(StatelessPrinter::new(
            printer,
            SaveAndRunCommand::new(
                SaveToDisk::new(directory),
                RunCommand::new(program.clone(), args.clone()),
            ),
        )),
        BehaviourConfig::PostToRemoteService { postage } => Arc::new(StatelessPrinter::new(
            printer,
            PostToRemoteService::new(PostageClient::new(postage.clone())),
        )),
        BehaviourConfig::RejectAll => Arc::new(RejectAll::new(printer)),
    }
}
