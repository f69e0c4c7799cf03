//! User Data Header handling for concatenated SMS: building the 8-bit
//! reference header for outgoing segments and parsing inbound headers for
//! observation.

use thiserror::Error;

/// Information Element: concatenated short message, 8-bit reference.
const IEI_CONCAT_8BIT: u8 = 0x00;
/// Information Element: concatenated short message, 16-bit reference.
const IEI_CONCAT_16BIT: u8 = 0x08;

#[derive(Debug, Error, PartialEq)]
pub enum UdhError {
    #[error("invalid UDH length")]
    InvalidLength,

    #[error("segment index {segment} exceeds segment count {segments}")]
    InvalidSegment { segment: u8, segments: u8 },
}

/// A parsed concatenation header.
#[derive(Debug, Clone, PartialEq)]
pub struct Udh {
    /// Total octets the header occupies at the front of short_message.
    pub octets: usize,
    /// CSMS reference shared by all segments of one logical message.
    pub reference: u16,
    /// Total number of segments.
    pub segments: u8,
    /// This segment's 1-based index.
    pub segment: u8,
}

/// Builds the concatenation header prepended to every segment:
/// `[0x05, 0x00, 0x03, reference, total, seq]`.
pub fn concat_header(reference: u8, total: u8, seq: u8) -> [u8; 6] {
    [
        5,               // UDH length
        IEI_CONCAT_8BIT, // CSMS, 8-bit reference number
        3,               // length of the element, excluding the first two octets
        reference,
        total,
        seq,
    ]
}

/// Parses the UDH at the front of a short_message payload (the UDHI bit in
/// esm_class says one is present).
pub fn parse(payload: &[u8]) -> Result<Udh, UdhError> {
    if payload.len() < 3 {
        return Err(UdhError::InvalidLength);
    }

    let udh_len = payload[0] as usize;
    if payload.len() < udh_len + 1 {
        return Err(UdhError::InvalidLength);
    }

    let reference = match payload[1] {
        IEI_CONCAT_8BIT => payload[3] as u16,
        IEI_CONCAT_16BIT => u16::from_be_bytes([payload[3], payload[4]]),
        _ => 0,
    };

    let segments = payload[udh_len - 1];
    let segment = payload[udh_len];

    if segment > segments {
        return Err(UdhError::InvalidSegment { segment, segments });
    }

    Ok(Udh {
        octets: udh_len + 1,
        reference,
        segments,
        segment,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concat_header_layout() {
        assert_eq!(concat_header(0xAB, 3, 2), [0x05, 0x00, 0x03, 0xAB, 0x03, 0x02]);
    }

    #[test]
    fn parse_own_header() {
        let header = concat_header(0x42, 4, 1);
        let udh = parse(&header).unwrap();

        assert_eq!(udh.octets, 6);
        assert_eq!(udh.reference, 0x42);
        assert_eq!(udh.segments, 4);
        assert_eq!(udh.segment, 1);
    }

    #[test]
    fn parse_16bit_reference() {
        let payload = [0x06, IEI_CONCAT_16BIT, 0x04, 0x01, 0x02, 0x03, 0x01];
        let udh = parse(&payload).unwrap();

        assert_eq!(udh.octets, 7);
        assert_eq!(udh.reference, 0x0102);
        assert_eq!(udh.segments, 3);
        assert_eq!(udh.segment, 1);
    }

    #[test]
    fn parse_rejects_truncation() {
        assert_eq!(parse(&[0x05, 0x00]), Err(UdhError::InvalidLength));
        assert_eq!(parse(&[0x05, 0x00, 0x03, 0xAB]), Err(UdhError::InvalidLength));
    }

    #[test]
    fn parse_rejects_out_of_range_segment() {
        let payload = concat_header(0xAB, 2, 3);
        assert_eq!(
            parse(&payload),
            Err(UdhError::InvalidSegment {
                segment: 3,
                segments: 2
            })
        );
    }
}
