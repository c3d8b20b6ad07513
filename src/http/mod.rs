//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → transport.rs (request line, headers, body framing)
//!     → dispatcher.rs (GET web surface | POST IPP, error containment)
//!     → resources.rs (fixed text bodies)
//!     → transport.rs (status line, body, close)
//! ```
//!
//! # Design Decisions
//! - One request per connection; the response ends when the socket closes
//! - No Content-Length and no chunked encoding on responses
//! - The dispatcher only sees the `Transport` trait, so it can be driven by a
//!   scripted transport in tests

pub mod dispatcher;
pub mod resources;
pub mod status;
pub mod transport;

pub use dispatcher::{ConnectionDispatcher, DispatchError, FailureKind, Outcome};
pub use status::{Status, CONTENT_TYPE_IPP, CONTENT_TYPE_TEXT};
pub use transport::{HttpTransport, Method, RequestHead, Transport, TransportError};
