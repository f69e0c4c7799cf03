use bytes::{Buf, BytesMut};
use std::io::Cursor;

use crate::codec::{CodecError, Encodable, PduHeader, decode_cstring, decode_u8, encode_cstring};
use crate::datatypes::{
    CommandId, CommandStatus, InterfaceVersion, NumericPlanIndicator, Tlv, TypeOfNumber, tags,
};

/// The three bind operations share one body layout (SMPP v3.4 §4.1); only
/// the command id differs. The SMSC authenticates all of them the same way,
/// so they are folded into a single PDU type carrying its kind.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BindKind {
    Transmitter,
    Receiver,
    Transceiver,
}

impl BindKind {
    pub fn request_id(&self) -> CommandId {
        match self {
            BindKind::Transmitter => CommandId::BindTransmitter,
            BindKind::Receiver => CommandId::BindReceiver,
            BindKind::Transceiver => CommandId::BindTransceiver,
        }
    }

    pub fn response_id(&self) -> CommandId {
        match self {
            BindKind::Transmitter => CommandId::BindTransmitterResp,
            BindKind::Receiver => CommandId::BindReceiverResp,
            BindKind::Transceiver => CommandId::BindTransceiverResp,
        }
    }
}

/// bind_transmitter / bind_receiver / bind_transceiver request.
#[derive(Clone, Debug, PartialEq)]
pub struct Bind {
    pub kind: BindKind,
    pub sequence_number: u32,

    /// 5.2.1 system_id, up to 15 characters. Doubles as the session name in
    /// the registry.
    pub system_id: String,
    /// 5.2.2 password; absent when the ESME sends an empty field.
    pub password: Option<String>,
    pub system_type: String,
    pub interface_version: InterfaceVersion,
    pub addr_ton: TypeOfNumber,
    pub addr_npi: NumericPlanIndicator,
    pub address_range: String,
}

impl Bind {
    /// Parses the body shared by the three bind kinds.
    pub fn decode(
        kind: BindKind,
        header: PduHeader,
        buf: &mut Cursor<&[u8]>,
    ) -> Result<Self, CodecError> {
        let system_id = decode_cstring(buf, 16, "system_id")?;
        let password = decode_cstring(buf, 9, "password")?;
        let system_type = decode_cstring(buf, 13, "system_type")?;
        let interface_version = InterfaceVersion::try_from(decode_u8(buf)?)
            .unwrap_or(InterfaceVersion::SmppV34);
        let addr_ton = TypeOfNumber::from_wire(decode_u8(buf)?);
        let addr_npi = NumericPlanIndicator::from_wire(decode_u8(buf)?);
        let address_range = decode_cstring(buf, 41, "address_range")?;

        Ok(Self {
            kind,
            sequence_number: header.sequence_number,
            system_id,
            password: (!password.is_empty()).then_some(password),
            system_type,
            interface_version,
            addr_ton,
            addr_npi,
            address_range,
        })
    }
}

impl Encodable for Bind {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        PduHeader::new(self.kind.request_id(), CommandStatus::Ok, self.sequence_number)
            .encode(buf);

        encode_cstring(buf, &self.system_id, 16);
        encode_cstring(buf, self.password.as_deref().unwrap_or(""), 9);
        encode_cstring(buf, &self.system_type, 13);
        buf.extend_from_slice(&[
            self.interface_version as u8,
            self.addr_ton as u8,
            self.addr_npi as u8,
        ]);
        encode_cstring(buf, &self.address_range, 41);
        Ok(())
    }
}

/// bind_*_resp, mirroring the request kind. A successful response carries
/// the SMSC `system_id` and the `sc_interface_version` TLV.
#[derive(Clone, Debug, PartialEq)]
pub struct BindResponse {
    pub kind: BindKind,
    pub command_status: CommandStatus,
    pub sequence_number: u32,
    pub system_id: String,
    pub sc_interface_version: Option<Tlv>,
}

impl BindResponse {
    pub fn ok(kind: BindKind, sequence_number: u32, system_id: &str) -> Self {
        Self {
            kind,
            command_status: CommandStatus::Ok,
            sequence_number,
            system_id: system_id.to_owned(),
            sc_interface_version: Some(Tlv::u8(tags::SC_INTERFACE_VERSION, 0x34)),
        }
    }

    pub fn error(kind: BindKind, sequence_number: u32, status: CommandStatus) -> Self {
        Self {
            kind,
            command_status: status,
            sequence_number,
            system_id: String::new(),
            sc_interface_version: None,
        }
    }

    pub fn decode(
        kind: BindKind,
        header: PduHeader,
        buf: &mut Cursor<&[u8]>,
    ) -> Result<Self, CodecError> {
        // An error response may omit the body entirely.
        let system_id = if buf.has_remaining() {
            decode_cstring(buf, 16, "system_id")?
        } else {
            String::new()
        };

        let sc_interface_version = if buf.has_remaining() {
            Some(Tlv::decode(buf)?)
        } else {
            None
        };

        Ok(Self {
            kind,
            command_status: header.command_status,
            sequence_number: header.sequence_number,
            system_id,
            sc_interface_version,
        })
    }
}

impl Encodable for BindResponse {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        PduHeader::new(self.kind.response_id(), self.command_status, self.sequence_number)
            .encode(buf);

        encode_cstring(buf, &self.system_id, 16);
        if let Some(tlv) = &self.sc_interface_version {
            tlv.encode(buf);
        }
        Ok(())
    }
}
