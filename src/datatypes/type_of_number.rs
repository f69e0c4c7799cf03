use num_enum::TryFromPrimitive;

/// Type of Number for source and destination addresses (SMPP v3.4 §5.2.5).
///
/// Paired with [`NumericPlanIndicator`](super::NumericPlanIndicator) to
/// describe the addressing scheme; the address classifier picks the pair
/// from the shape of the raw address string.
#[derive(TryFromPrimitive)]
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TypeOfNumber {
    Unknown = 0b0000_0000,
    /// E.164 with country code, e.g. "+33600000001".
    International = 0b0000_0001,
    /// National number without country code.
    National = 0b0000_0010,
    NetworkSpecific = 0b0000_0011,
    SubscriberNumber = 0b0000_0100,
    /// Text sender identity, e.g. "GOPHER".
    Alphanumeric = 0b0000_0101,
    Abbreviated = 0b0000_0110,
}

impl TypeOfNumber {
    /// Lenient conversion for inbound PDUs; unknown values degrade to
    /// `Unknown` rather than failing the frame.
    pub fn from_wire(raw: u8) -> Self {
        Self::try_from(raw).unwrap_or(TypeOfNumber::Unknown)
    }
}
