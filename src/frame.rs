//! The `Frame` type: one decoded SMPP PDU, plus utilities to check and
//! parse frames from a byte buffer.

use bytes::Bytes;
use core::fmt;
use std::io::Cursor;

use crate::codec::{CodecError, Decodable, Encodable, PduHeader, peek_u32};
use crate::datatypes::{
    Bind, BindKind, BindResponse, CommandId, DeliverSm, DeliverSmResponse, EnquireLink,
    EnquireLinkResponse, GenericNack, SubmitSm, SubmitSmResponse, Unbind, UnbindResponse,
};

/// A single SMPP PDU, in either direction.
///
/// `Unknown` keeps the raw header of a command this SMSC does not implement;
/// the session answers those with a generic_nack (Invalid Command ID)
/// instead of tearing the connection down.
#[derive(Clone, Debug)]
pub enum Frame {
    Bind(Bind),
    BindResp(BindResponse),
    EnquireLink(EnquireLink),
    EnquireLinkResp(EnquireLinkResponse),
    SubmitSm(Box<SubmitSm>),
    SubmitSmResp(SubmitSmResponse),
    DeliverSm(Box<DeliverSm>),
    DeliverSmResp(DeliverSmResponse),
    Unbind(Unbind),
    UnbindResp(UnbindResponse),
    GenericNack(GenericNack),
    Unknown { command_id: u32, sequence_number: u32 },
}

#[derive(Debug)]
pub enum Error {
    /// Not enough buffered data for a complete PDU.
    Incomplete,

    /// The buffered data does not form a valid PDU.
    Other(CodecError),
}

impl Frame {
    /// Checks whether `src` starts with a complete PDU and returns its
    /// command_length, without allocating anything. Much cheaper than a
    /// full parse while bytes are still trickling in.
    pub fn check(src: &mut Cursor<&[u8]>) -> Result<usize, Error> {
        let command_length = peek_u32(src).map_err(|_| Error::Incomplete)? as usize;

        if command_length < PduHeader::SIZE {
            return Err(Error::Other(CodecError::InvalidPduLength {
                length: command_length as u32,
                max: crate::codec::MAX_PDU_SIZE,
            }));
        }

        if src.get_ref().len() - src.position() as usize >= command_length {
            Ok(command_length)
        } else {
            Err(Error::Incomplete)
        }
    }

    /// Parses one PDU from a cursor that covers exactly `command_length`
    /// bytes (as sliced by the connection after a successful `check`).
    pub fn parse(src: &mut Cursor<&[u8]>) -> Result<Frame, Error> {
        let header = PduHeader::decode(src)?;

        let Ok(command_id) = CommandId::try_from(header.command_id) else {
            return Ok(Frame::Unknown {
                command_id: header.command_id,
                sequence_number: header.sequence_number,
            });
        };

        let frame = match command_id {
            CommandId::BindTransmitter => {
                Frame::Bind(Bind::decode(BindKind::Transmitter, header, src)?)
            }
            CommandId::BindReceiver => Frame::Bind(Bind::decode(BindKind::Receiver, header, src)?),
            CommandId::BindTransceiver => {
                Frame::Bind(Bind::decode(BindKind::Transceiver, header, src)?)
            }
            CommandId::BindTransmitterResp => {
                Frame::BindResp(BindResponse::decode(BindKind::Transmitter, header, src)?)
            }
            CommandId::BindReceiverResp => {
                Frame::BindResp(BindResponse::decode(BindKind::Receiver, header, src)?)
            }
            CommandId::BindTransceiverResp => {
                Frame::BindResp(BindResponse::decode(BindKind::Transceiver, header, src)?)
            }
            CommandId::EnquireLink => Frame::EnquireLink(EnquireLink::decode(header, src)?),
            CommandId::EnquireLinkResp => {
                Frame::EnquireLinkResp(EnquireLinkResponse::decode(header, src)?)
            }
            CommandId::SubmitSm => Frame::SubmitSm(Box::new(SubmitSm::decode(header, src)?)),
            CommandId::SubmitSmResp => Frame::SubmitSmResp(SubmitSmResponse::decode(header, src)?),
            CommandId::DeliverSm => Frame::DeliverSm(Box::new(DeliverSm::decode(header, src)?)),
            CommandId::DeliverSmResp => {
                Frame::DeliverSmResp(DeliverSmResponse::decode(header, src)?)
            }
            CommandId::Unbind => Frame::Unbind(Unbind::decode(header, src)?),
            CommandId::UnbindResp => Frame::UnbindResp(UnbindResponse::decode(header, src)?),
            CommandId::GenericNack => Frame::GenericNack(GenericNack::decode(header, src)?),
        };

        Ok(frame)
    }

    /// Serializes the frame, patching command_length.
    pub fn to_bytes(&self) -> Bytes {
        match self {
            Frame::Bind(pdu) => pdu.to_bytes(),
            Frame::BindResp(pdu) => pdu.to_bytes(),
            Frame::EnquireLink(pdu) => pdu.to_bytes(),
            Frame::EnquireLinkResp(pdu) => pdu.to_bytes(),
            Frame::SubmitSm(pdu) => pdu.to_bytes(),
            Frame::SubmitSmResp(pdu) => pdu.to_bytes(),
            Frame::DeliverSm(pdu) => pdu.to_bytes(),
            Frame::DeliverSmResp(pdu) => pdu.to_bytes(),
            Frame::Unbind(pdu) => pdu.to_bytes(),
            Frame::UnbindResp(pdu) => pdu.to_bytes(),
            Frame::GenericNack(pdu) => pdu.to_bytes(),
            // Nothing meaningful to emit for a command we do not implement.
            Frame::Unknown {
                command_id,
                sequence_number,
            } => {
                let header = PduHeader {
                    command_length: PduHeader::SIZE as u32,
                    command_id: *command_id,
                    command_status: crate::datatypes::CommandStatus::Ok,
                    sequence_number: *sequence_number,
                };
                let mut buf = bytes::BytesMut::new();
                header.encode(&mut buf);
                buf.freeze()
            }
        }
    }

    pub fn sequence_number(&self) -> u32 {
        match self {
            Frame::Bind(pdu) => pdu.sequence_number,
            Frame::BindResp(pdu) => pdu.sequence_number,
            Frame::EnquireLink(pdu) => pdu.sequence_number,
            Frame::EnquireLinkResp(pdu) => pdu.sequence_number,
            Frame::SubmitSm(pdu) => pdu.sequence_number,
            Frame::SubmitSmResp(pdu) => pdu.sequence_number,
            Frame::DeliverSm(pdu) => pdu.sequence_number,
            Frame::DeliverSmResp(pdu) => pdu.sequence_number,
            Frame::Unbind(pdu) => pdu.sequence_number,
            Frame::UnbindResp(pdu) => pdu.sequence_number,
            Frame::GenericNack(pdu) => pdu.sequence_number,
            Frame::Unknown {
                sequence_number, ..
            } => *sequence_number,
        }
    }

    /// Wire name of the command, for logs.
    pub fn command_name(&self) -> &'static str {
        match self {
            Frame::Bind(pdu) => match pdu.kind {
                BindKind::Transmitter => "bind_transmitter",
                BindKind::Receiver => "bind_receiver",
                BindKind::Transceiver => "bind_transceiver",
            },
            Frame::BindResp(pdu) => match pdu.kind {
                BindKind::Transmitter => "bind_transmitter_resp",
                BindKind::Receiver => "bind_receiver_resp",
                BindKind::Transceiver => "bind_transceiver_resp",
            },
            Frame::EnquireLink(_) => "enquire_link",
            Frame::EnquireLinkResp(_) => "enquire_link_resp",
            Frame::SubmitSm(_) => "submit_sm",
            Frame::SubmitSmResp(_) => "submit_sm_resp",
            Frame::DeliverSm(_) => "deliver_sm",
            Frame::DeliverSmResp(_) => "deliver_sm_resp",
            Frame::Unbind(_) => "unbind",
            Frame::UnbindResp(_) => "unbind_resp",
            Frame::GenericNack(_) => "generic_nack",
            Frame::Unknown { .. } => "unknown",
        }
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Frame::Unknown { command_id, .. } => {
                write!(f, "unknown command 0x{command_id:08X} seq={}", self.sequence_number())
            }
            _ => write!(f, "{} seq={}", self.command_name(), self.sequence_number()),
        }
    }
}

impl From<CodecError> for Error {
    fn from(src: CodecError) -> Self {
        match src {
            CodecError::Incomplete => Error::Incomplete,
            other => Error::Other(other),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Incomplete => "stream ended early".fmt(f),
            Error::Other(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {}
