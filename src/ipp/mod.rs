//! IPP message codec.
//!
//! # Data Flow
//! ```text
//! POST body (Bytes)
//!     → message.rs (decode header + attribute groups, stop at end tag)
//!     → IppMessage (handed to the Behaviour)
//!     → Behaviour builds a response IppMessage
//!     → message.rs (encode, grouped by delimiter tag)
//!     → response body
//! ```
//!
//! # Design Decisions
//! - Attribute values are kept as raw bytes; typed views live in values.rs
//! - Unknown value tags survive a decode/encode cycle untouched
//! - Decoding consumes only the attribute section, leaving trailing document
//!   data in the caller's buffer

pub mod constants;
pub mod message;
pub mod values;

pub use constants::{GroupTag, JobState, Operation, StatusCode, ValueTag};
pub use message::{Attribute, CodecError, IppMessage};
