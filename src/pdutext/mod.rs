//! Text codec engine: decides between GSM 03.38 and UCS2 for an outgoing
//! message, computes sizes and segment counts, and cuts multipart messages
//! at valid boundaries.

mod gsm7;
pub mod udh;

pub use gsm7::{gsm7_size, is_gsm7};

/// Max characters in a single-segment SMS.
pub const SIZE_GSM7_SINGLE: usize = 160;
/// Max characters per segment once the UDH reserves its overhead.
pub const SIZE_GSM7_MULTIPART: usize = 153;
/// Max UCS2 code points in a single-segment SMS.
pub const SIZE_UCS2_SINGLE: usize = 70;
/// Max UCS2 code points per segment once the UDH reserves its overhead.
pub const SIZE_UCS2_MULTIPART: usize = 67;

/// The two encodings this SMSC emits. GSM7 is preferred whenever the whole
/// message fits the GSM 03.38 set.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TextCodec {
    Gsm7,
    Ucs2,
}

impl TextCodec {
    /// SMPP data_coding value (§5.2.19).
    pub fn data_coding(&self) -> u8 {
        match self {
            TextCodec::Gsm7 => 0x00,
            TextCodec::Ucs2 => 0x08,
        }
    }

    /// Encodes text for the short_message field: unpacked GSM 03.38 octets
    /// (escape-prefixed for extension characters), or UTF-16BE.
    pub fn encode(&self, text: &str) -> Vec<u8> {
        match self {
            TextCodec::Gsm7 => gsm7::encode(text),
            TextCodec::Ucs2 => text.encode_utf16().flat_map(u16::to_be_bytes).collect(),
        }
    }

    pub fn single_capacity(&self) -> usize {
        match self {
            TextCodec::Gsm7 => SIZE_GSM7_SINGLE,
            TextCodec::Ucs2 => SIZE_UCS2_SINGLE,
        }
    }

    pub fn multipart_capacity(&self) -> usize {
        match self {
            TextCodec::Gsm7 => SIZE_GSM7_MULTIPART,
            TextCodec::Ucs2 => SIZE_UCS2_MULTIPART,
        }
    }
}

/// Picks the codec for a message and computes its logical size and segment
/// count in one go.
pub fn select_codec(message: &str) -> (TextCodec, usize, usize) {
    let codec = if is_gsm7(message) {
        TextCodec::Gsm7
    } else {
        TextCodec::Ucs2
    };
    (codec, size(message), segments(message))
}

/// Logical message size: GSM7 septet count (extension characters weigh 2)
/// when the message is GSM7-clean, Unicode code points otherwise.
pub fn size(message: &str) -> usize {
    if is_gsm7(message) {
        gsm7_size(message)
    } else {
        message.chars().count()
    }
}

/// Number of SMS segments needed for the message. A message that fits one
/// segment is never split; otherwise segments are cut at the multipart
/// capacity, never inside a two-septet extension character.
pub fn segments(message: &str) -> usize {
    let codec = if is_gsm7(message) {
        TextCodec::Gsm7
    } else {
        TextCodec::Ucs2
    };

    if size(message) <= codec.single_capacity() {
        return 1;
    }
    split(message, codec.multipart_capacity()).len()
}

/// Cuts the message into substrings whose per-codec size is at most
/// `segment_size`. A character that would overflow the current segment
/// starts the next one, so a GSM7 extension character never straddles a
/// boundary.
pub fn split(message: &str, segment_size: usize) -> Vec<String> {
    let gsm7 = is_gsm7(message);

    let mut parts = Vec::new();
    let mut current = String::new();
    let mut used = 0;

    for c in message.chars() {
        let weight = if gsm7 { gsm7::char_size(c) } else { 1 };
        if used + weight > segment_size && !current.is_empty() {
            parts.push(std::mem::take(&mut current));
            used = 0;
        }
        current.push(c);
        used += weight;
    }

    if !current.is_empty() || parts.is_empty() {
        parts.push(current);
    }
    parts
}
