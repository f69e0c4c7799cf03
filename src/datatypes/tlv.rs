use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io::Cursor;

use crate::codec::CodecError;

/// Standard TLV tags (SMPP v3.4 §5.3.2) this SMSC emits or renders by name.
pub mod tags {
    pub const RECEIPTED_MESSAGE_ID: u16 = 0x001E;
    pub const USER_MESSAGE_REFERENCE: u16 = 0x0204;
    pub const SOURCE_PORT: u16 = 0x020A;
    pub const DESTINATION_PORT: u16 = 0x020B;
    pub const SAR_MSG_REF_NUM: u16 = 0x020C;
    pub const SAR_TOTAL_SEGMENTS: u16 = 0x020E;
    pub const SAR_SEGMENT_SEQNUM: u16 = 0x020F;
    pub const SC_INTERFACE_VERSION: u16 = 0x0210;
    pub const NETWORK_ERROR_CODE: u16 = 0x0423;
    pub const MESSAGE_PAYLOAD: u16 = 0x0424;
    pub const MORE_MESSAGES_TO_SEND: u16 = 0x0426;
    pub const MESSAGE_STATE: u16 = 0x0427;
    pub const USSD_SERVICE_OP: u16 = 0x0501;

    /// Human-readable name for a tag, used by the PDU dumper. Unknown tags
    /// are rendered in hex by the caller.
    pub fn name(tag: u16) -> Option<&'static str> {
        Some(match tag {
            RECEIPTED_MESSAGE_ID => "receipted_message_id",
            USER_MESSAGE_REFERENCE => "user_message_reference",
            SOURCE_PORT => "source_port",
            DESTINATION_PORT => "destination_port",
            SAR_MSG_REF_NUM => "sar_msg_ref_num",
            SAR_TOTAL_SEGMENTS => "sar_total_segments",
            SAR_SEGMENT_SEQNUM => "sar_segment_seqnum",
            SC_INTERFACE_VERSION => "sc_interface_version",
            NETWORK_ERROR_CODE => "network_error_code",
            MESSAGE_PAYLOAD => "message_payload",
            MORE_MESSAGES_TO_SEND => "more_messages_to_send",
            MESSAGE_STATE => "message_state",
            USSD_SERVICE_OP => "ussd_service_op",
            _ => return None,
        })
    }
}

/// An SMPP optional parameter: tag, length and opaque value octets.
///
/// TLVs this SMSC does not understand are carried verbatim so that inbound
/// PDUs can be dumped and re-emitted without loss.
#[derive(Clone, Debug, PartialEq)]
pub struct Tlv {
    pub tag: u16,
    pub value: Bytes,
}

impl Tlv {
    pub fn new(tag: u16, value: impl Into<Bytes>) -> Self {
        Self {
            tag,
            value: value.into(),
        }
    }

    /// A single-octet TLV, e.g. `sc_interface_version = 0x34`.
    pub fn u8(tag: u16, value: u8) -> Self {
        Self::new(tag, vec![value])
    }

    /// A NUL-terminated string TLV, e.g. `receipted_message_id`.
    pub fn cstring(tag: u16, value: &str) -> Self {
        let mut v = Vec::with_capacity(value.len() + 1);
        v.extend_from_slice(value.as_bytes());
        v.push(0);
        Self::new(tag, v)
    }

    /// The value interpreted as a NUL-terminated string, if it is one.
    pub fn as_cstring(&self) -> Option<&str> {
        let end = self.value.iter().position(|&b| b == 0)?;
        std::str::from_utf8(&self.value[..end]).ok()
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u16(self.tag);
        buf.put_u16(self.value.len() as u16);
        buf.extend_from_slice(&self.value);
    }

    pub fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        if buf.remaining() < 4 {
            return Err(CodecError::Incomplete);
        }

        let tag = buf.get_u16();
        let length = buf.get_u16() as usize;
        if buf.remaining() < length {
            return Err(CodecError::Incomplete);
        }
        let value = buf.copy_to_bytes(length);

        Ok(Self { tag, value })
    }

    /// Decodes all TLVs up to the end of the buffer.
    pub fn decode_all(buf: &mut Cursor<&[u8]>) -> Result<Vec<Self>, CodecError> {
        let mut tlvs = Vec::new();
        while buf.has_remaining() {
            tlvs.push(Self::decode(buf)?);
        }
        Ok(tlvs)
    }
}
