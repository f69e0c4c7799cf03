//! One bound SMPP session: the Listen dispatch loop, the sequence cache
//! correlating deliver_sm with deliver_sm_resp, delivery receipt
//! fabrication, and single/multipart MT sending.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::address::Address;
use crate::connection::{FrameReader, FrameWriter};
use crate::datatypes::{
    DeliverSm, EnquireLinkResponse, GenericNack, SubmitSm, SubmitSmResponse, Tlv, Unbind,
    UnbindResponse, tags,
};
use crate::frame::Frame;
use crate::message::Message;
use crate::pdutext::{self, udh};

/// User Data Header Indicator bit of esm_class.
pub const UDHI: u8 = 0b0100_0000;

/// esm_class of a final delivery receipt (§5.2.12).
const ESM_CLASS_DLR_FINAL: u8 = 0b0000_0100;

/// registered_delivery value asking for a receipt on final outcome.
pub const FINAL_DELIVERY_RECEIPT: u8 = 0x01;

const SEND_TIMEOUT: Duration = Duration::from_secs(10);
const SEND_POLL_INTERVAL: Duration = Duration::from_millis(250);
const DLR_DELAY: Duration = Duration::from_secs(1);
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

const CACHE_MAX_ENTRIES: usize = 10_000;
const CACHE_TTL: Duration = Duration::from_secs(600);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Connection accepted, bind handshake in progress.
    Binding,
    /// Bound; the dispatch loop is serving traffic.
    Active,
    /// An unbind has been sent or received; waiting for the exchange to
    /// complete.
    Closing,
    /// The socket is gone.
    Closed,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("timeout")]
    Timeout,

    #[error("{0}")]
    Remote(crate::datatypes::CommandStatus),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A live SMPP session. The server task owns the read half and runs
/// [`Session::listen`]; HTTP tasks share the session through the registry
/// and call [`Session::send`].
pub struct Session {
    system_id: String,
    writer: tokio::sync::Mutex<FrameWriter>,
    sequences: Mutex<SequenceCache>,
    sequence: AtomicU32,
    state: watch::Sender<SessionState>,
}

impl Session {
    pub fn new(writer: FrameWriter, system_id: &str) -> Self {
        Self {
            system_id: system_id.to_owned(),
            writer: tokio::sync::Mutex::new(writer),
            sequences: Mutex::new(SequenceCache::new(CACHE_MAX_ENTRIES, CACHE_TTL)),
            sequence: AtomicU32::new(1),
            state: watch::Sender::new(SessionState::Binding),
        }
    }

    /// The bind name, which is also the registry key.
    pub fn system_id(&self) -> &str {
        &self.system_id
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Called by the listener once the bind response has been written.
    pub fn set_active(&self) {
        self.state.send_replace(SessionState::Active);
    }

    fn set_state(&self, state: SessionState) {
        self.state.send_replace(state);
    }

    /// Next sequence number for an SMSC-originated PDU.
    fn next_sequence(&self) -> u32 {
        self.sequence.fetch_add(1, Ordering::Relaxed)
    }

    /// Writes one PDU; the writer mutex keeps concurrent senders from
    /// interleaving octets.
    pub(crate) async fn write(&self, frame: &Frame) -> std::io::Result<()> {
        self.writer.lock().await.write_frame(frame).await
    }

    /// The dispatch loop: reads PDUs until the session ends, answering per
    /// the v3.4 table. Decode errors on single PDUs are logged and skipped;
    /// EOF and socket errors end the session.
    pub async fn listen(self: std::sync::Arc<Self>, mut reader: FrameReader) {
        loop {
            let frame = match reader.read_frame().await {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    info!(session = %self.system_id, "session closed by peer");
                    break;
                }
                Err(e) if e.is_recoverable() => {
                    error!(session = %self.system_id, "pdu decode: {e}");
                    continue;
                }
                Err(e) => {
                    error!(session = %self.system_id, "connection lost: {e}");
                    break;
                }
            };

            let response = match frame {
                Frame::EnquireLink(pdu) => {
                    // Heartbeat.
                    Some(Frame::EnquireLinkResp(EnquireLinkResponse::new(pdu.sequence_number)))
                }
                Frame::DeliverSmResp(pdu) => {
                    // Ack of an MT delivery or DLR we sent.
                    info!(session = %self.system_id, seq = pdu.sequence_number, "ack sms/dlr");
                    self.add_pdu(Frame::DeliverSmResp(pdu));
                    None
                }
                Frame::SubmitSm(pdu) => {
                    let id = message_id();
                    self.observe_udh(&pdu);
                    Session::schedule_dlr(&self, &pdu, &id);
                    Some(Frame::SubmitSmResp(SubmitSmResponse::new(pdu.sequence_number, &id)))
                }
                Frame::Unbind(pdu) => {
                    // Peer-initiated close: answer, then drop the socket.
                    info!(session = %self.system_id, "unbinding session");
                    self.set_state(SessionState::Closing);
                    let resp = Frame::UnbindResp(UnbindResponse::new(pdu.sequence_number));
                    if let Err(e) = self.write(&resp).await {
                        error!(session = %self.system_id, "unbind_resp: {e}");
                    }
                    break;
                }
                Frame::UnbindResp(_) => {
                    // Completes a close we initiated.
                    info!(session = %self.system_id, "unbound session");
                    break;
                }
                Frame::GenericNack(pdu) => {
                    warn!(session = %self.system_id, "generic_nack: {}", pdu.command_status);
                    None
                }
                other => {
                    // Includes binds on an already-bound session.
                    Some(Frame::GenericNack(GenericNack::invalid_command_id(
                        other.sequence_number(),
                    )))
                }
            };

            if let Some(response) = response {
                if let Err(e) = self.write(&response).await {
                    error!(session = %self.system_id, "write {}: {e}", response.command_name());
                    break;
                }
            }
        }

        self.shutdown_writer().await;
        self.set_state(SessionState::Closed);
    }

    /// Initiates an orderly close: sends unbind, waits (bounded) for the
    /// Listen loop to see the unbind_resp, then gives up on the socket.
    pub async fn close(&self) -> std::io::Result<()> {
        let initiated = self.state.send_if_modified(|state| {
            if *state == SessionState::Active {
                *state = SessionState::Closing;
                true
            } else {
                false
            }
        });
        if !initiated {
            return Ok(());
        }

        info!(session = %self.system_id, "closing session");
        self.write(&Frame::Unbind(Unbind::new(self.next_sequence())))
            .await?;

        let mut state = self.state.subscribe();
        let done = state.wait_for(|s| *s == SessionState::Closed);
        if tokio::time::timeout(CLOSE_TIMEOUT, done).await.is_err() {
            warn!(session = %self.system_id, "no unbind_resp, dropping socket");
            self.shutdown_writer().await;
        }
        Ok(())
    }

    async fn shutdown_writer(&self) {
        let _ = self.writer.lock().await.shutdown().await;
    }

    /// Stores a response PDU for later correlation. Entries age out by TTL,
    /// they are not consumed by reads.
    pub fn add_pdu(&self, frame: Frame) {
        let mut cache = self.sequences.lock().expect("sequence cache poisoned");
        cache.insert(frame.sequence_number(), frame);
    }

    /// The cached response for a sequence number, if any.
    pub fn pdu(&self, sequence: u32) -> Option<Frame> {
        let cache = self.sequences.lock().expect("sequence cache poisoned");
        cache.get(sequence)
    }

    /// Sends an MT message on this session as one or more deliver_sm PDUs
    /// built from `template`, then waits for the correlated
    /// deliver_sm_resp. Returns the awaited sequence number.
    pub async fn send(&self, message: &Message, template: &DeliverSm) -> Result<u32, SessionError> {
        let mut template = template.clone();
        self.apply_defaults(message, &mut template);

        let sequence = if message.segments > 1 {
            self.send_multipart(message, &template).await?
        } else {
            self.send_single(message, &template).await?
        };

        self.await_response(sequence).await?;
        Ok(sequence)
    }

    /// Fills template fields derived from the message: classified
    /// addresses, validity, codec and caller TLVs.
    fn apply_defaults(&self, message: &Message, pdu: &mut DeliverSm) {
        let src = Address::parse(&message.src);
        pdu.source_addr = src.to_string();
        pdu.source_addr_ton = src.ton();
        pdu.source_addr_npi = src.npi();

        let dst = Address::parse(&message.dst);
        pdu.destination_addr = dst.to_string();
        pdu.dest_addr_ton = dst.ton();
        pdu.dest_addr_npi = dst.npi();

        pdu.registered_delivery = message.registered_delivery;
        if let Some(validity) = message.validity {
            pdu.validity_period = validity_period(validity);
        }
        pdu.service_type = message.service_type.clone();
        pdu.esm_class = message.esm_class;
        pdu.protocol_id = message.protocol_id;
        pdu.priority_flag = message.priority_flag;
        pdu.schedule_delivery_time = message.schedule_delivery_time.clone();
        pdu.replace_if_present_flag = message.replace_if_present_flag;
        pdu.sm_default_msg_id = message.sm_default_msg_id;
        pdu.data_coding = message.codec.data_coding();
        pdu.tlvs.extend(message.tlvs.iter().cloned());
    }

    async fn send_single(&self, message: &Message, template: &DeliverSm) -> Result<u32, SessionError> {
        let mut pdu = template.clone();
        pdu.sequence_number = self.next_sequence();
        pdu.short_message = Bytes::from(message.codec.encode(&message.text));

        let sequence = pdu.sequence_number;
        self.write(&Frame::DeliverSm(Box::new(pdu))).await?;
        Ok(sequence)
    }

    /// One PDU per segment, each built fresh from the template: UDH with a
    /// shared CSMS reference, UDHI bit set, the segment's encoded text.
    async fn send_multipart(
        &self,
        message: &Message,
        template: &DeliverSm,
    ) -> Result<u32, SessionError> {
        let reference = rand::random::<u8>();
        let total = message.segments as u8;
        let parts = pdutext::split(&message.text, message.codec.multipart_capacity());

        let mut sequence = 0;
        for (i, part) in parts.iter().enumerate() {
            let mut pdu = template.clone();
            pdu.sequence_number = self.next_sequence();
            pdu.esm_class = template.esm_class | UDHI;

            let mut payload = udh::concat_header(reference, total, (i + 1) as u8).to_vec();
            payload.extend(message.codec.encode(part));
            pdu.short_message = Bytes::from(payload);

            sequence = pdu.sequence_number;
            self.write(&Frame::DeliverSm(Box::new(pdu))).await?;
        }

        Ok(sequence)
    }

    /// Polls the sequence cache every 250 ms for up to 10 s. A status of 0
    /// is success; anything else surfaces as a remote error.
    async fn await_response(&self, sequence: u32) -> Result<(), SessionError> {
        let start = Instant::now();
        loop {
            tokio::time::sleep(SEND_POLL_INTERVAL).await;

            match self.pdu(sequence) {
                Some(Frame::DeliverSmResp(resp)) => {
                    return if resp.command_status == crate::datatypes::CommandStatus::Ok {
                        Ok(())
                    } else {
                        Err(SessionError::Remote(resp.command_status))
                    };
                }
                Some(_) | None => {
                    if start.elapsed() > SEND_TIMEOUT {
                        return Err(SessionError::Timeout);
                    }
                }
            }
        }
    }

    /// Logs the concatenation header of an inbound multipart submit_sm.
    fn observe_udh(&self, submit: &SubmitSm) {
        if submit.esm_class & UDHI == 0 {
            return;
        }
        match udh::parse(&submit.short_message) {
            Ok(udh) => info!(
                session = %self.system_id,
                "multipart submit_sm segment {}/{} ref={}",
                udh.segment, udh.segments, udh.reference
            ),
            Err(e) => warn!(session = %self.system_id, "udh parse: {e}"),
        }
    }

    /// Fabricates the delivery receipt for a submit_sm, honouring the two
    /// low bits of registered_delivery: receipts are emitted for "success
    /// or failure" (0x01) and the reserved 0x03, none for "no receipt"
    /// (0x00) or "failure only" (0x02, which never happens here).
    fn schedule_dlr(session: &std::sync::Arc<Self>, submit: &SubmitSm, id: &str) {
        match submit.registered_delivery & 0b0000_0011 {
            0x00 | 0x02 => return,
            _ => {}
        }

        let session = std::sync::Arc::clone(session);
        let mut dlr = build_dlr(submit, id, Utc::now());

        // Delayed so the receipt always trails the submit_sm_resp.
        tokio::spawn(async move {
            tokio::time::sleep(DLR_DELAY).await;

            dlr.sequence_number = session.next_sequence();
            match session.write(&Frame::DeliverSm(Box::new(dlr))).await {
                Ok(()) => info!(session = %session.system_id, "DLR DELIVRD"),
                Err(e) => error!(session = %session.system_id, "could not send DLR: {e}"),
            }
        });
    }
}

/// The delivery receipt deliver_sm for a submitted message: addresses
/// swapped, final-DLR esm_class, Kannel-compatible receipt text and the
/// receipted_message_id TLV.
fn build_dlr(submit: &SubmitSm, id: &str, at: DateTime<Utc>) -> DeliverSm {
    let mut dlr = DeliverSm::new();

    dlr.source_addr = submit.destination_addr.clone();
    dlr.source_addr_ton = submit.dest_addr_ton;
    dlr.source_addr_npi = submit.dest_addr_npi;

    dlr.destination_addr = submit.source_addr.clone();
    dlr.dest_addr_ton = submit.source_addr_ton;
    dlr.dest_addr_npi = submit.source_addr_npi;

    dlr.esm_class = ESM_CLASS_DLR_FINAL;

    let text = receipt_text(id, at);
    let (codec, _, _) = pdutext::select_codec(&text);
    dlr.data_coding = codec.data_coding();
    dlr.short_message = Bytes::from(codec.encode(&text));

    dlr.tlvs.push(Tlv::cstring(tags::RECEIPTED_MESSAGE_ID, id));

    dlr
}

/// The receipt body in the format Kannel parses.
fn receipt_text(id: &str, at: DateTime<Utc>) -> String {
    let date = at.format("%y%m%d%H%M");
    format!("id:{id} sub:001 dlvrd:001 submit date:{date} done date:{date} stat:DELIVRD err:000")
}

/// Absolute validity in the SMPP §7.1.1 time format, UTC.
fn format_validity(at: DateTime<Utc>) -> String {
    format!("{}000+", at.format("%y%m%d%H%M%S"))
}

fn validity_period(validity: Duration) -> String {
    let validity = chrono::Duration::from_std(validity).unwrap_or_else(|_| chrono::Duration::zero());
    format_validity(Utc::now() + validity)
}

/// A short opaque message id: a base62-encoded random 64-bit value.
pub fn message_id() -> String {
    const ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

    let mut value = rand::random::<u64>();
    let mut out = Vec::new();
    while value > 0 {
        out.push(ALPHABET[(value % 62) as usize]);
        value /= 62;
    }
    if out.is_empty() {
        out.push(b'0');
    }
    out.reverse();
    String::from_utf8(out).expect("alphabet is ASCII")
}

/// Bounded TTL cache of response PDUs keyed by sequence number. Oldest
/// entries give way when the element cap is hit; expired entries are
/// dropped on insert and ignored on read.
struct SequenceCache {
    max_entries: usize,
    ttl: Duration,
    entries: HashMap<u32, (Instant, Frame)>,
}

impl SequenceCache {
    fn new(max_entries: usize, ttl: Duration) -> Self {
        Self {
            max_entries,
            ttl,
            entries: HashMap::new(),
        }
    }

    fn insert(&mut self, sequence: u32, frame: Frame) {
        self.insert_at(sequence, frame, Instant::now())
    }

    fn insert_at(&mut self, sequence: u32, frame: Frame, now: Instant) {
        self.entries
            .retain(|_, (stored, _)| now.saturating_duration_since(*stored) <= self.ttl);

        if self.entries.len() >= self.max_entries {
            if let Some(oldest) = self
                .entries
                .iter()
                .min_by_key(|(_, (stored, _))| *stored)
                .map(|(seq, _)| *seq)
            {
                self.entries.remove(&oldest);
            }
        }

        self.entries.insert(sequence, (now, frame));
    }

    fn get(&self, sequence: u32) -> Option<Frame> {
        self.get_at(sequence, Instant::now())
    }

    fn get_at(&self, sequence: u32, now: Instant) -> Option<Frame> {
        let (stored, frame) = self.entries.get(&sequence)?;
        if now.saturating_duration_since(*stored) > self.ttl {
            return None;
        }
        Some(frame.clone())
    }
}
