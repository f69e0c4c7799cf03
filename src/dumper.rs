//! Human-readable PDU rendering. Every PDU crossing a connection is logged
//! with its header, mandatory fields and optional parameters, which is the
//! whole point of a simulator you run to watch traffic.

use crate::datatypes::{DeliverSm, SubmitSm, Tlv, tags};
use crate::frame::Frame;

pub fn dump_inbound(frame: &Frame) {
    tracing::info!(target: "smsc3::pdu", dir = "recv", pdu = frame.command_name(), seq = frame.sequence_number(), "{}", render(frame));
}

pub fn dump_outbound(frame: &Frame) {
    tracing::info!(target: "smsc3::pdu", dir = "send", pdu = frame.command_name(), seq = frame.sequence_number(), "{}", render(frame));
}

/// Body fields as `key=value` pairs, one line per PDU.
fn render(frame: &Frame) -> String {
    match frame {
        Frame::Bind(pdu) => format!(
            "system_id={} system_type={} interface_version=0x{:02X}",
            pdu.system_id, pdu.system_type, pdu.interface_version as u8
        ),
        Frame::BindResp(pdu) => format!(
            "status=0x{:08X} ({}) system_id={}{}",
            pdu.command_status as u32,
            pdu.command_status,
            pdu.system_id,
            render_tlvs(pdu.sc_interface_version.as_slice())
        ),
        Frame::SubmitSm(pdu) => render_submit_sm(pdu),
        Frame::SubmitSmResp(pdu) => format!(
            "status=0x{:08X} ({}) message_id={}",
            pdu.command_status as u32, pdu.command_status, pdu.message_id
        ),
        Frame::DeliverSm(pdu) => render_deliver_sm(pdu),
        Frame::DeliverSmResp(pdu) => format!(
            "status=0x{:08X} ({})",
            pdu.command_status as u32, pdu.command_status
        ),
        Frame::GenericNack(pdu) => format!(
            "status=0x{:08X} ({})",
            pdu.command_status as u32, pdu.command_status
        ),
        Frame::UnbindResp(pdu) => format!(
            "status=0x{:08X} ({})",
            pdu.command_status as u32, pdu.command_status
        ),
        Frame::EnquireLink(_) | Frame::EnquireLinkResp(_) | Frame::Unbind(_) => String::new(),
        Frame::Unknown { command_id, .. } => format!("command_id=0x{command_id:08X}"),
    }
}

fn render_submit_sm(pdu: &SubmitSm) -> String {
    format!(
        "src={} (ton={} npi={}) dst={} (ton={} npi={}) esm_class=0x{:02X} registered_delivery=0x{:02X} data_coding=0x{:02X} sm={}{}",
        pdu.source_addr,
        pdu.source_addr_ton as u8,
        pdu.source_addr_npi as u8,
        pdu.destination_addr,
        pdu.dest_addr_ton as u8,
        pdu.dest_addr_npi as u8,
        pdu.esm_class,
        pdu.registered_delivery,
        pdu.data_coding,
        render_short_message(&pdu.short_message),
        render_tlvs(&pdu.tlvs),
    )
}

fn render_deliver_sm(pdu: &DeliverSm) -> String {
    format!(
        "src={} (ton={} npi={}) dst={} (ton={} npi={}) esm_class=0x{:02X} data_coding=0x{:02X} sm={}{}",
        pdu.source_addr,
        pdu.source_addr_ton as u8,
        pdu.source_addr_npi as u8,
        pdu.destination_addr,
        pdu.dest_addr_ton as u8,
        pdu.dest_addr_npi as u8,
        pdu.esm_class,
        pdu.data_coding,
        render_short_message(&pdu.short_message),
        render_tlvs(&pdu.tlvs),
    )
}

/// Printable preview of the payload; binary content falls back to hex.
fn render_short_message(payload: &[u8]) -> String {
    const PREVIEW: usize = 64;

    let printable = payload
        .iter()
        .all(|&b| (0x20..0x7F).contains(&b) || b == b'\r' || b == b'\n');

    if printable {
        let text = String::from_utf8_lossy(payload);
        if text.len() > PREVIEW {
            format!("{:?}… ({} octets)", &text[..PREVIEW], payload.len())
        } else {
            format!("{text:?}")
        }
    } else {
        let shown = &payload[..payload.len().min(PREVIEW)];
        let hex: String = shown.iter().map(|b| format!("{b:02X}")).collect();
        format!("0x{}{} ({} octets)", hex, if payload.len() > PREVIEW { "…" } else { "" }, payload.len())
    }
}

fn render_tlvs(tlvs: &[Tlv]) -> String {
    let mut out = String::new();
    for tlv in tlvs {
        let name = tags::name(tlv.tag)
            .map(str::to_owned)
            .unwrap_or_else(|| format!("0x{:04X}", tlv.tag));

        // Single octets are almost always small integers; strings get their
        // text; anything else is hex.
        let value = if tlv.value.len() == 1 {
            format!("0x{:02X}", tlv.value[0])
        } else if let Some(s) = tlv.as_cstring() {
            format!("{s:?}")
        } else {
            let hex: String = tlv.value.iter().map(|b| format!("{b:02X}")).collect();
            format!("0x{hex}")
        };

        out.push_str(&format!(" tlv.{name}={value}"));
    }
    out
}
