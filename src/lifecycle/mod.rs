//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validate config → Install metrics → Build behaviour → Bind and serve
//!
//! Shutdown (shutdown.rs):
//!     Trigger → Accept loop exits → In-flight connections finish on their own
//!
//! Signals (signals.rs):
//!     SIGINT/SIGTERM → Trigger shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, listener last
//! - Shutdown only stops accepting; no connection is cancelled

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{start, StartupError};
