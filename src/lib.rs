//! A small IPP print server.
//!
//! One port carries two surfaces: GET requests reach a tiny web surface
//! (homepage and PPD), POST requests carry IPP. Accepted print jobs are
//! handed to one behaviour chosen at startup: save to disk, run a command,
//! save and run, post as a letter, or reject.

// Core subsystems
pub mod behaviour;
pub mod http;
pub mod ipp;
pub mod net;
pub mod ppd;
pub mod server;

// Cross-cutting concerns
pub mod cli;
pub mod config;
pub mod lifecycle;
pub mod observability;
pub mod panic;

pub use behaviour::{Behaviour, BehaviourError};
pub use config::ServerConfig;
pub use http::{ConnectionDispatcher, Outcome};
pub use server::{Server, ServerError};
