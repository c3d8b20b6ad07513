//! Helpers for reporting caught panic payloads.

use std::{any::Any, fmt};

/// Formats a panic payload for logs.
///
/// `String` and `&'static str` payloads are printed as-is, anything else via
/// `Debug`.
#[derive(Debug)]
pub struct PanicMessage(Box<dyn Any + Send>);

impl fmt::Display for PanicMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(s) = self.0.downcast_ref::<String>() {
            f.write_str(s)
        } else if let Some(s) = self.0.downcast_ref::<&'static str>() {
            f.write_str(s)
        } else {
            write!(f, "{:?}", self.0)
        }
    }
}

pub fn format_panic(panic: Box<dyn Any + Send>) -> PanicMessage {
    PanicMessage(panic)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_payloads_are_printed_verbatim() {
        assert_eq!(format_panic(Box::new("boom")).to_string(), "boom");
        assert_eq!(format_panic(Box::new(String::from("bang"))).to_string(), "bang");
    }

    #[test]
    fn other_payloads_fall_back_to_debug() {
        assert!(format_panic(Box::new(5_u32)).to_string().contains("Any"));
    }
}
