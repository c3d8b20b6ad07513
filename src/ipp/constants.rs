//! Tag, operation and status code registries (RFC 8010 / RFC 8011 and CUPS).

use std::fmt;

/// Delimiter tag introducing an attribute group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupTag(pub u8);

impl GroupTag {
    pub const OPERATION: Self = Self(0x01);
    pub const JOB: Self = Self(0x02);
    pub const END_OF_ATTRIBUTES: Self = Self(0x03);
    pub const PRINTER: Self = Self(0x04);
    pub const UNSUPPORTED: Self = Self(0x05);

    /// Tags `0x00..=0x0f` are delimiters; everything above is a value tag.
    pub fn is_delimiter(tag: u8) -> bool {
        tag <= 0x0f
    }
}

/// Value tag of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueTag(pub u8);

impl ValueTag {
    pub const INTEGER: Self = Self(0x21);
    pub const BOOLEAN: Self = Self(0x22);
    pub const ENUM: Self = Self(0x23);
    pub const OCTET_STRING: Self = Self(0x30);
    pub const DATE_TIME: Self = Self(0x31);
    pub const RESOLUTION: Self = Self(0x32);
    pub const RANGE_OF_INTEGER: Self = Self(0x33);
    pub const BEGIN_COLLECTION: Self = Self(0x34);
    pub const TEXT_WITH_LANGUAGE: Self = Self(0x35);
    pub const NAME_WITH_LANGUAGE: Self = Self(0x36);
    pub const END_COLLECTION: Self = Self(0x37);
    pub const TEXT_WITHOUT_LANGUAGE: Self = Self(0x41);
    pub const NAME_WITHOUT_LANGUAGE: Self = Self(0x42);
    pub const KEYWORD: Self = Self(0x44);
    pub const URI: Self = Self(0x45);
    pub const URI_SCHEME: Self = Self(0x46);
    pub const CHARSET: Self = Self(0x47);
    pub const NATURAL_LANGUAGE: Self = Self(0x48);
    pub const MIME_MEDIA_TYPE: Self = Self(0x49);
    pub const MEMBER_ATTR_NAME: Self = Self(0x4a);
}

/// IPP operation identifiers understood by the printers in this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Operation(pub u16);

impl Operation {
    pub const PRINT_JOB: Self = Self(0x0002);
    pub const VALIDATE_JOB: Self = Self(0x0004);
    pub const CANCEL_JOB: Self = Self(0x0008);
    pub const GET_JOB_ATTRIBUTES: Self = Self(0x0009);
    pub const GET_JOBS: Self = Self(0x000a);
    pub const GET_PRINTER_ATTRIBUTES: Self = Self(0x000b);
    pub const CUPS_GET_DEFAULT: Self = Self(0x4001);
    pub const CUPS_GET_PRINTERS: Self = Self(0x4002);
    /// `\r\n` read as an operation id: an HTTP request sent where IPP was expected.
    pub const MISIDENTIFIED_HTTP: Self = Self(0x0d0a);

    /// Short name used in logs and metric labels.
    pub fn name(self) -> &'static str {
        match self {
            Self::PRINT_JOB => "print-job",
            Self::VALIDATE_JOB => "validate-job",
            Self::CANCEL_JOB => "cancel-job",
            Self::GET_JOB_ATTRIBUTES => "get-job-attributes",
            Self::GET_JOBS => "get-jobs",
            Self::GET_PRINTER_ATTRIBUTES => "get-printer-attributes",
            Self::CUPS_GET_DEFAULT => "cups-get-default",
            Self::CUPS_GET_PRINTERS => "cups-get-printers",
            _ => "unknown",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:04x})", self.name(), self.0)
    }
}

/// IPP response status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusCode(pub u16);

impl StatusCode {
    pub const OK: Self = Self(0x0000);
    pub const CLIENT_ERROR_BAD_REQUEST: Self = Self(0x0400);
    pub const CLIENT_ERROR_NOT_FOUND: Self = Self(0x0406);
    pub const SERVER_ERROR_INTERNAL_ERROR: Self = Self(0x0500);
    pub const SERVER_ERROR_OPERATION_NOT_SUPPORTED: Self = Self(0x0501);
}

/// Job states from RFC 8011 section 5.3.7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum JobState {
    Pending = 3,
    PendingHeld = 4,
    Processing = 5,
    ProcessingStopped = 6,
    Canceled = 7,
    Aborted = 8,
    Completed = 9,
}

/// Printer state `idle`.
pub const PRINTER_STATE_IDLE: i32 = 3;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delimiter_range() {
        assert!(GroupTag::is_delimiter(0x00));
        assert!(GroupTag::is_delimiter(GroupTag::END_OF_ATTRIBUTES.0));
        assert!(GroupTag::is_delimiter(0x0f));
        assert!(!GroupTag::is_delimiter(ValueTag::INTEGER.0));
    }

    #[test]
    fn operation_display_includes_hex() {
        assert_eq!(Operation::PRINT_JOB.to_string(), "print-job (0x0002)");
        assert_eq!(Operation(0x1234).to_string(), "unknown (0x1234)");
    }
}
