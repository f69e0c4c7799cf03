//! The [`Message`] value an MT delivery is built from before it is encoded
//! into one or more deliver_sm PDUs.

use std::time::Duration;

use crate::datatypes::Tlv;
use crate::pdutext::{self, TextCodec};

/// A short message to push to a bound ESME, plus the PDU fields a caller
/// may want to pin. Codec, size and segment count are derived from the text
/// at construction.
#[derive(Clone, Debug)]
pub struct Message {
    pub src: String,
    pub dst: String,
    pub text: String,
    pub codec: TextCodec,
    pub size: usize,
    pub segments: usize,

    /// registered_delivery octet for the emitted deliver_sm.
    pub registered_delivery: u8,
    /// Optional absolute validity, converted to the SMPP time format on
    /// send.
    pub validity: Option<Duration>,
    pub tlvs: Vec<Tlv>,

    pub service_type: String,
    pub esm_class: u8,
    pub protocol_id: u8,
    pub priority_flag: u8,
    pub schedule_delivery_time: String,
    pub replace_if_present_flag: u8,
    pub sm_default_msg_id: u8,
}

impl Message {
    pub fn new(src: &str, dst: &str, text: &str) -> Self {
        let (codec, size, segments) = pdutext::select_codec(text);
        Self {
            src: src.to_owned(),
            dst: dst.to_owned(),
            text: text.to_owned(),
            codec,
            size,
            segments,
            registered_delivery: 0,
            validity: None,
            tlvs: Vec::new(),
            service_type: String::new(),
            esm_class: 0,
            protocol_id: 0,
            priority_flag: 0,
            schedule_delivery_time: String::new(),
            replace_if_present_flag: 0,
            sm_default_msg_id: 0,
        }
    }
}
