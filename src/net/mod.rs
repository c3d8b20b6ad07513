//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, back-off on accept errors)
//!     → connection.rs (connection id, live connection count)
//!     → Hand off to the HTTP dispatcher
//! ```
//!
//! # Design Decisions
//! - No connection limit: every accepted socket gets its own task
//! - Accept errors never stop the listener
//! - Each connection is tracked so logs and tests can observe its closure

pub mod backoff;
pub mod connection;
pub mod listener;

pub use connection::{ConnectionGuard, ConnectionId, ConnectionTracker};
pub use listener::{Listener, ListenerError};
