use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io::Cursor;

use crate::codec::{CodecError, Decodable, Encodable, PduHeader, decode_cstring, decode_u8, encode_cstring};
use crate::datatypes::{CommandId, CommandStatus, NumericPlanIndicator, Tlv, TypeOfNumber};

/// deliver_sm (SMPP v3.4 §4.6): the SMSC hands a message to a bound ESME.
/// Used both for HTTP-injected MT traffic and for fabricated delivery
/// receipts (swapped addresses, final DLR esm_class).
#[derive(Clone, Debug, PartialEq)]
pub struct DeliverSm {
    pub sequence_number: u32,

    pub service_type: String,
    pub source_addr_ton: TypeOfNumber,
    pub source_addr_npi: NumericPlanIndicator,
    pub source_addr: String,
    pub dest_addr_ton: TypeOfNumber,
    pub dest_addr_npi: NumericPlanIndicator,
    pub destination_addr: String,
    pub esm_class: u8,
    pub protocol_id: u8,
    pub priority_flag: u8,
    pub schedule_delivery_time: String,
    pub validity_period: String,
    pub registered_delivery: u8,
    pub replace_if_present_flag: u8,
    pub data_coding: u8,
    pub sm_default_msg_id: u8,
    pub short_message: Bytes,

    pub tlvs: Vec<Tlv>,
}

impl DeliverSm {
    /// An empty template; the session fills addresses, coding and payload
    /// before each serialization.
    pub fn new() -> Self {
        Self {
            sequence_number: 0,
            service_type: String::new(),
            source_addr_ton: TypeOfNumber::Unknown,
            source_addr_npi: NumericPlanIndicator::Unknown,
            source_addr: String::new(),
            dest_addr_ton: TypeOfNumber::Unknown,
            dest_addr_npi: NumericPlanIndicator::Unknown,
            destination_addr: String::new(),
            esm_class: 0,
            protocol_id: 0,
            priority_flag: 0,
            schedule_delivery_time: String::new(),
            validity_period: String::new(),
            registered_delivery: 0,
            replace_if_present_flag: 0,
            data_coding: 0,
            sm_default_msg_id: 0,
            short_message: Bytes::new(),
            tlvs: Vec::new(),
        }
    }
}

impl Default for DeliverSm {
    fn default() -> Self {
        Self::new()
    }
}

impl Decodable for DeliverSm {
    fn command_id() -> CommandId {
        CommandId::DeliverSm
    }

    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        let service_type = decode_cstring(buf, 6, "service_type")?;
        let source_addr_ton = TypeOfNumber::from_wire(decode_u8(buf)?);
        let source_addr_npi = NumericPlanIndicator::from_wire(decode_u8(buf)?);
        let source_addr = decode_cstring(buf, 21, "source_addr")?;
        let dest_addr_ton = TypeOfNumber::from_wire(decode_u8(buf)?);
        let dest_addr_npi = NumericPlanIndicator::from_wire(decode_u8(buf)?);
        let destination_addr = decode_cstring(buf, 21, "destination_addr")?;
        let esm_class = decode_u8(buf)?;
        let protocol_id = decode_u8(buf)?;
        let priority_flag = decode_u8(buf)?;
        let schedule_delivery_time = decode_cstring(buf, 17, "schedule_delivery_time")?;
        let validity_period = decode_cstring(buf, 17, "validity_period")?;
        let registered_delivery = decode_u8(buf)?;
        let replace_if_present_flag = decode_u8(buf)?;
        let data_coding = decode_u8(buf)?;
        let sm_default_msg_id = decode_u8(buf)?;

        let sm_length = decode_u8(buf)? as usize;
        if buf.remaining() < sm_length {
            return Err(CodecError::Incomplete);
        }
        let short_message = buf.copy_to_bytes(sm_length);

        let tlvs = Tlv::decode_all(buf)?;

        Ok(Self {
            sequence_number: header.sequence_number,
            service_type,
            source_addr_ton,
            source_addr_npi,
            source_addr,
            dest_addr_ton,
            dest_addr_npi,
            destination_addr,
            esm_class,
            protocol_id,
            priority_flag,
            schedule_delivery_time,
            validity_period,
            registered_delivery,
            replace_if_present_flag,
            data_coding,
            sm_default_msg_id,
            short_message,
            tlvs,
        })
    }
}

impl Encodable for DeliverSm {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        PduHeader::new(CommandId::DeliverSm, CommandStatus::Ok, self.sequence_number).encode(buf);

        encode_cstring(buf, &self.service_type, 6);
        buf.put_u8(self.source_addr_ton as u8);
        buf.put_u8(self.source_addr_npi as u8);
        encode_cstring(buf, &self.source_addr, 21);
        buf.put_u8(self.dest_addr_ton as u8);
        buf.put_u8(self.dest_addr_npi as u8);
        encode_cstring(buf, &self.destination_addr, 21);
        buf.put_u8(self.esm_class);
        buf.put_u8(self.protocol_id);
        buf.put_u8(self.priority_flag);
        encode_cstring(buf, &self.schedule_delivery_time, 17);
        encode_cstring(buf, &self.validity_period, 17);
        buf.put_u8(self.registered_delivery);
        buf.put_u8(self.replace_if_present_flag);
        buf.put_u8(self.data_coding);
        buf.put_u8(self.sm_default_msg_id);
        buf.put_u8(self.short_message.len() as u8);
        buf.extend_from_slice(&self.short_message);

        for tlv in &self.tlvs {
            tlv.encode(buf);
        }
        Ok(())
    }
}

/// deliver_sm_resp from the ESME, acknowledging an MT delivery or a DLR.
/// Its status decides the outcome of `Session::send`.
#[derive(Clone, Debug, PartialEq)]
pub struct DeliverSmResponse {
    pub command_status: CommandStatus,
    pub sequence_number: u32,
    pub message_id: String,
}

impl DeliverSmResponse {
    pub fn new(sequence_number: u32) -> Self {
        Self {
            command_status: CommandStatus::Ok,
            sequence_number,
            message_id: String::new(),
        }
    }

    pub fn error(sequence_number: u32, status: CommandStatus) -> Self {
        Self {
            command_status: status,
            sequence_number,
            message_id: String::new(),
        }
    }
}

impl Decodable for DeliverSmResponse {
    fn command_id() -> CommandId {
        CommandId::DeliverSmResp
    }

    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        // The message_id field is unused in deliver_sm_resp but present on
        // the wire; some ESMEs omit it entirely.
        let message_id = if buf.has_remaining() {
            decode_cstring(buf, 65, "message_id")?
        } else {
            String::new()
        };

        Ok(Self {
            command_status: header.command_status,
            sequence_number: header.sequence_number,
            message_id,
        })
    }
}

impl Encodable for DeliverSmResponse {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        PduHeader::new(CommandId::DeliverSmResp, self.command_status, self.sequence_number)
            .encode(buf);
        encode_cstring(buf, &self.message_id, 65);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatypes::tags;

    #[test]
    fn deliver_sm_roundtrip_with_receipt_tlv() {
        let mut pdu = DeliverSm::new();
        pdu.sequence_number = 7;
        pdu.source_addr = "+33222".into();
        pdu.source_addr_ton = TypeOfNumber::International;
        pdu.source_addr_npi = NumericPlanIndicator::Isdn;
        pdu.destination_addr = "+33111".into();
        pdu.dest_addr_ton = TypeOfNumber::International;
        pdu.dest_addr_npi = NumericPlanIndicator::Isdn;
        pdu.esm_class = 0b0000_0100;
        pdu.short_message = Bytes::from_static(b"id:1 stat:DELIVRD");
        pdu.tlvs = vec![Tlv::cstring(tags::RECEIPTED_MESSAGE_ID, "1")];

        let bytes = pdu.to_bytes();
        let mut cursor = Cursor::new(bytes.as_ref());
        let header = PduHeader::decode(&mut cursor).unwrap();
        assert_eq!(header.command_id, CommandId::DeliverSm as u32);

        let decoded = DeliverSm::decode(header, &mut cursor).unwrap();
        assert_eq!(decoded, pdu);
    }

    #[test]
    fn deliver_sm_resp_without_message_id_field() {
        // Header-only response, as some ESMEs send it.
        let data: Vec<u8> = vec![
            0x00, 0x00, 0x00, 0x10, // command_length
            0x80, 0x00, 0x00, 0x05, // command_id (deliver_sm_resp)
            0x00, 0x00, 0x00, 0x00, // command_status
            0x00, 0x00, 0x00, 0x09, // sequence_number
        ];

        let mut cursor = Cursor::new(&data[..]);
        let header = PduHeader::decode(&mut cursor).unwrap();
        let decoded = DeliverSmResponse::decode(header, &mut cursor).unwrap();

        assert_eq!(decoded.command_status, CommandStatus::Ok);
        assert_eq!(decoded.sequence_number, 9);
        assert_eq!(decoded.message_id, "");
    }
}
