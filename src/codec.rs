//! Wire-format layer: the 16-byte PDU header, the `Encodable`/`Decodable`
//! traits each PDU implements, and helpers for the SMPP field primitives
//! (big-endian integers and NUL-terminated C-octet strings).

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io::Cursor;
use thiserror::Error;

use crate::datatypes::{CommandId, CommandStatus};

/// Upper bound on a single PDU, to keep a misbehaving peer from ballooning
/// the read buffer.
pub const MAX_PDU_SIZE: u32 = 64 * 1024;

/// SMPP v3.4 PDU header, common to every operation.
///
/// `command_id` is kept raw here: the frame layer decides whether the id is
/// one this SMSC understands, and unknown ids must survive decoding so the
/// session can answer them with a generic_nack.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PduHeader {
    pub command_length: u32,
    pub command_id: u32,
    pub command_status: CommandStatus,
    pub sequence_number: u32,
}

impl PduHeader {
    pub const SIZE: usize = 16;

    pub fn new(command_id: CommandId, command_status: CommandStatus, sequence_number: u32) -> Self {
        Self {
            // Patched by `Encodable::to_bytes` once the body size is known.
            command_length: Self::SIZE as u32,
            command_id: command_id as u32,
            command_status,
            sequence_number,
        }
    }

    pub fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        if buf.remaining() < Self::SIZE {
            return Err(CodecError::Incomplete);
        }

        let command_length = buf.get_u32();
        let command_id = buf.get_u32();
        let command_status = CommandStatus::from_wire(buf.get_u32());
        let sequence_number = buf.get_u32();

        if command_length < Self::SIZE as u32 || command_length > MAX_PDU_SIZE {
            return Err(CodecError::InvalidPduLength {
                length: command_length,
                max: MAX_PDU_SIZE,
            });
        }

        Ok(Self {
            command_length,
            command_id,
            command_status,
            sequence_number,
        })
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u32(self.command_length);
        buf.put_u32(self.command_id);
        buf.put_u32(self.command_status as u32);
        buf.put_u32(self.sequence_number);
    }
}

/// A PDU that can be written to the wire.
pub trait Encodable {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError>;

    /// Encodes into a fresh buffer and patches `command_length` with the
    /// final size.
    fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::new();
        self.encode(&mut buf)
            .expect("encoding an owned PDU cannot fail");

        let length = buf.len() as u32;
        buf[0..4].copy_from_slice(&length.to_be_bytes());
        buf.freeze()
    }
}

/// A PDU body that can be parsed once the header has been read.
pub trait Decodable: Sized {
    fn command_id() -> CommandId;

    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError>;
}

#[derive(Debug, Error)]
pub enum CodecError {
    /// More data is needed; an expected runtime condition while a frame is
    /// still arriving, never fatal by itself.
    #[error("incomplete PDU, need more data")]
    Incomplete,

    #[error("invalid command_length {length} (allowed 16..={max})")]
    InvalidPduLength { length: u32, max: u32 },

    #[error("field '{field}': {reason}")]
    FieldValidation { field: &'static str, reason: String },

    #[error("field '{field}' is not valid UTF-8")]
    Utf8 { field: &'static str },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Reads a NUL-terminated C-octet string of at most `max_len` octets
/// (terminator included). The terminator is consumed but not returned.
pub fn decode_cstring(
    buf: &mut Cursor<&[u8]>,
    max_len: usize,
    field: &'static str,
) -> Result<String, CodecError> {
    let window = buf.chunk();
    let bound = window.len().min(max_len);

    let end = window[..bound]
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| CodecError::FieldValidation {
            field,
            reason: format!("missing NUL terminator within {max_len} octets"),
        })?;

    let value = std::str::from_utf8(&window[..end])
        .map_err(|_| CodecError::Utf8 { field })?
        .to_owned();

    buf.advance(end + 1);
    Ok(value)
}

/// Writes a C-octet string, truncating to the field maximum (terminator
/// included) the way the SMPP field widths demand.
pub fn encode_cstring(buf: &mut BytesMut, value: &str, max_len: usize) {
    let bytes = value.as_bytes();
    let len = bytes.len().min(max_len - 1);
    buf.put_slice(&bytes[..len]);
    buf.put_u8(0);
}

pub fn decode_u8(buf: &mut Cursor<&[u8]>) -> Result<u8, CodecError> {
    if !buf.has_remaining() {
        return Err(CodecError::Incomplete);
    }
    Ok(buf.get_u8())
}

pub fn peek_u32(buf: &mut Cursor<&[u8]>) -> Result<u32, CodecError> {
    if buf.remaining() < 4 {
        return Err(CodecError::Incomplete);
    }

    let pos = buf.position();
    let value = buf.get_u32();
    buf.set_position(pos);
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_roundtrip() {
        let header = PduHeader::new(CommandId::EnquireLink, CommandStatus::Ok, 42);

        let mut buf = BytesMut::new();
        header.encode(&mut buf);
        assert_eq!(buf.len(), PduHeader::SIZE);

        let mut cursor = Cursor::new(buf.as_ref());
        let decoded = PduHeader::decode(&mut cursor).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn header_rejects_undersized_length() {
        let data: &[u8] = &[
            0x00, 0x00, 0x00, 0x08, // command_length below header size
            0x00, 0x00, 0x00, 0x15, // command_id
            0x00, 0x00, 0x00, 0x00, // command_status
            0x00, 0x00, 0x00, 0x01, // sequence_number
        ];
        let mut cursor = Cursor::new(data);
        assert!(matches!(
            PduHeader::decode(&mut cursor),
            Err(CodecError::InvalidPduLength { length: 8, .. })
        ));
    }

    #[test]
    fn header_tolerates_unknown_status() {
        let data: &[u8] = &[
            0x00, 0x00, 0x00, 0x10, // command_length
            0x80, 0x00, 0x00, 0x05, // command_id (deliver_sm_resp)
            0x00, 0x00, 0xBE, 0xEF, // vendor-specific status
            0x00, 0x00, 0x00, 0x01, // sequence_number
        ];
        let mut cursor = Cursor::new(data);
        let header = PduHeader::decode(&mut cursor).unwrap();
        assert_eq!(header.command_status, CommandStatus::UnknownError);
    }

    #[test]
    fn cstring_roundtrip() {
        let mut buf = BytesMut::new();
        encode_cstring(&mut buf, "kannel", 16);
        assert_eq!(buf.as_ref(), b"kannel\0");

        let mut cursor = Cursor::new(buf.as_ref());
        let value = decode_cstring(&mut cursor, 16, "system_id").unwrap();
        assert_eq!(value, "kannel");
        assert_eq!(cursor.position(), 7);
    }

    #[test]
    fn cstring_empty() {
        let data = b"\0rest";
        let mut cursor = Cursor::new(&data[..]);
        let value = decode_cstring(&mut cursor, 16, "service_type").unwrap();
        assert_eq!(value, "");
        assert_eq!(cursor.position(), 1);
    }

    #[test]
    fn cstring_truncates_on_encode() {
        let mut buf = BytesMut::new();
        encode_cstring(&mut buf, "averylongsystemname", 9);
        assert_eq!(buf.len(), 9);
        assert_eq!(buf.as_ref(), b"averylon\0");
    }

    #[test]
    fn cstring_missing_terminator() {
        let data = b"unterminated";
        let mut cursor = Cursor::new(&data[..]);
        assert!(decode_cstring(&mut cursor, 6, "password").is_err());
    }
}
