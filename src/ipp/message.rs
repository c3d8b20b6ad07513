//! IPP request/response encoding.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

use super::constants::{GroupTag, Operation, StatusCode, ValueTag};
use super::values;

/// Errors raised while decoding an IPP message.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    /// The body ended before the end-of-attributes tag.
    #[error("message truncated while reading {0}")]
    Truncated(&'static str),

    /// A value tag appeared before any group delimiter.
    #[error("attribute with tag 0x{0:02x} appears outside an attribute group")]
    NoGroup(u8),

    /// An additional value (empty name) had no attribute to attach to.
    #[error("additional value with tag 0x{0:02x} has no preceding attribute")]
    OrphanValue(u8),

    #[error("attribute name is not valid UTF-8")]
    InvalidName,
}

/// A single attribute and all of its values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub group: GroupTag,
    pub name: String,
    pub tag: ValueTag,
    pub values: Vec<Bytes>,
}

impl Attribute {
    pub fn new(group: GroupTag, name: impl Into<String>, tag: ValueTag, values: Vec<Bytes>) -> Self {
        Self {
            group,
            name: name.into(),
            tag,
            values,
        }
    }

    /// First value interpreted as UTF-8 text.
    pub fn text(&self) -> Option<&str> {
        self.values.first().and_then(|v| std::str::from_utf8(v).ok())
    }

    /// First value interpreted as an integer or enum.
    pub fn integer(&self) -> Option<i32> {
        self.values.first().and_then(|v| values::read_integer(v))
    }
}

/// A decoded IPP request or response.
///
/// `code` holds the operation id in requests and the status code in responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IppMessage {
    pub version: (u8, u8),
    pub code: u16,
    pub request_id: u32,
    pub attributes: Vec<Attribute>,
}

impl IppMessage {
    /// Build a response echoing the request id of `request`.
    pub fn response(request: &IppMessage, version: (u8, u8), status: StatusCode) -> Self {
        Self {
            version,
            code: status.0,
            request_id: request.request_id,
            attributes: Vec::new(),
        }
    }

    pub fn operation(&self) -> Operation {
        Operation(self.code)
    }

    pub fn status(&self) -> StatusCode {
        StatusCode(self.code)
    }

    pub fn push(&mut self, attribute: Attribute) {
        self.attributes.push(attribute);
    }

    /// Look up an attribute by group and name.
    pub fn get(&self, group: GroupTag, name: &str) -> Option<&Attribute> {
        self.attributes
            .iter()
            .find(|a| a.group == group && a.name == name)
    }

    /// Look up an attribute in the operation group.
    pub fn operation_attribute(&self, name: &str) -> Option<&Attribute> {
        self.get(GroupTag::OPERATION, name)
    }

    /// Decode a message from the front of `buf`.
    ///
    /// Only the header and attribute groups are consumed; anything after the
    /// end-of-attributes tag (document data) is left in `buf`.
    pub fn decode(buf: &mut Bytes) -> Result<Self, CodecError> {
        ensure(buf, 8, "header")?;
        let version = (buf.get_u8(), buf.get_u8());
        let code = buf.get_u16();
        let request_id = buf.get_u32();

        let mut attributes: Vec<Attribute> = Vec::new();
        let mut group: Option<GroupTag> = None;

        loop {
            ensure(buf, 1, "tag")?;
            let tag = buf.get_u8();

            if GroupTag::is_delimiter(tag) {
                if tag == GroupTag::END_OF_ATTRIBUTES.0 {
                    break;
                }
                group = Some(GroupTag(tag));
                continue;
            }

            let current = group.ok_or(CodecError::NoGroup(tag))?;

            ensure(buf, 2, "name length")?;
            let name_len = usize::from(buf.get_u16());
            ensure(buf, name_len, "name")?;
            let name = buf.split_to(name_len);

            ensure(buf, 2, "value length")?;
            let value_len = usize::from(buf.get_u16());
            ensure(buf, value_len, "value")?;
            let value = buf.split_to(value_len);

            if name.is_empty() {
                let previous = attributes.last_mut().ok_or(CodecError::OrphanValue(tag))?;
                previous.values.push(value);
            } else {
                let name = std::str::from_utf8(&name).map_err(|_| CodecError::InvalidName)?;
                attributes.push(Attribute::new(current, name, ValueTag(tag), vec![value]));
            }
        }

        Ok(Self {
            version,
            code,
            request_id,
            attributes,
        })
    }

    /// Encode the message, ordering groups by delimiter tag.
    pub fn encode(&self) -> Bytes {
        let mut out = BytesMut::with_capacity(256);
        out.put_u8(self.version.0);
        out.put_u8(self.version.1);
        out.put_u16(self.code);
        out.put_u32(self.request_id);

        let mut ordered: Vec<&Attribute> = self.attributes.iter().collect();
        ordered.sort_by_key(|a| a.group);

        let mut current: Option<GroupTag> = None;
        for attribute in ordered {
            if current != Some(attribute.group) {
                out.put_u8(attribute.group.0);
                current = Some(attribute.group);
            }
            for (i, value) in attribute.values.iter().enumerate() {
                out.put_u8(attribute.tag.0);
                let name: &[u8] = if i == 0 { attribute.name.as_bytes() } else { &[] };
                put_sized(&mut out, name);
                put_sized(&mut out, value);
            }
        }
        out.put_u8(GroupTag::END_OF_ATTRIBUTES.0);
        out.freeze()
    }
}

fn ensure(buf: &Bytes, needed: usize, what: &'static str) -> Result<(), CodecError> {
    if buf.remaining() < needed {
        return Err(CodecError::Truncated(what));
    }
    Ok(())
}

// Names and values longer than u16::MAX are clipped; nothing in this crate
// produces them.
fn put_sized(out: &mut BytesMut, data: &[u8]) {
    let len = u16::try_from(data.len()).unwrap_or(u16::MAX);
    out.put_u16(len);
    out.put_slice(&data[..usize::from(len)]);
}
