//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! command line (cli.rs)
//!     → ServerConfig (listener, printer, behaviour, observability)
//!     → postage config file (JSON or TOML)
//!         → loader.rs (parse & deserialize)
//!         → validation.rs (semantic checks)
//!     → behaviour::build (one shared Behaviour)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once the server starts
//! - Printer identity fields have defaults so only the action is mandatory
//! - Validation separates syntactic (serde) from semantic checks and reports
//!   every problem at once

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_postage_config, ConfigError};
pub use schema::{
    BehaviourConfig, ListenerConfig, ObservabilityConfig, PostageConfig, PrinterConfig, Recipient,
    ServerConfig,
};
pub use validation::{validate_config, ValidationError};
