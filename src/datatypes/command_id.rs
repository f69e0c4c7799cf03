use num_enum::TryFromPrimitive;

/// SMPP v3.4 command identifiers (Table 4-1) for the operations this SMSC
/// speaks.
///
/// Bit 31 distinguishes responses from requests: a response id is the request
/// id with the MSB set. Identifiers outside this set are still accepted on
/// the wire (see `Frame::Unknown`) so the session can answer them with a
/// generic_nack instead of dropping the connection.
#[derive(TryFromPrimitive)]
#[repr(u32)]
#[derive(Clone, Debug, PartialEq, Eq, Hash, Copy)]
pub enum CommandId {
    GenericNack = 0x8000_0000,

    BindReceiver = 0x0000_0001,
    BindReceiverResp = 0x8000_0001,
    BindTransmitter = 0x0000_0002,
    BindTransmitterResp = 0x8000_0002,

    SubmitSm = 0x0000_0004,
    SubmitSmResp = 0x8000_0004,
    DeliverSm = 0x0000_0005,
    DeliverSmResp = 0x8000_0005,

    Unbind = 0x0000_0006,
    UnbindResp = 0x8000_0006,

    BindTransceiver = 0x0000_0009,
    BindTransceiverResp = 0x8000_0009,

    EnquireLink = 0x0000_0015,
    EnquireLinkResp = 0x8000_0015,
}

impl CommandId {
    /// True when the MSB response bit is set.
    pub fn is_response(&self) -> bool {
        (*self as u32) & 0x8000_0000 != 0
    }
}
