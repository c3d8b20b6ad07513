//! Typed encodings for attribute values.

use bytes::Bytes;

pub fn integer(value: i32) -> Bytes {
    Bytes::copy_from_slice(&value.to_be_bytes())
}

/// Enum values share the integer encoding.
pub fn enumeration(value: i32) -> Bytes {
    integer(value)
}

pub fn boolean(value: bool) -> Bytes {
    Bytes::from_static(if value { &[1] } else { &[0] })
}

pub fn text(value: impl Into<String>) -> Bytes {
    Bytes::from(value.into())
}

/// Reads a 4-byte big-endian integer value.
pub fn read_integer(value: &[u8]) -> Option<i32> {
    let raw: [u8; 4] = value.try_into().ok()?;
    Some(i32::from_be_bytes(raw))
}
