use num_enum::TryFromPrimitive;

/// Numbering Plan Indicator for source and destination addresses
/// (SMPP v3.4 §5.2.6).
#[derive(TryFromPrimitive)]
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NumericPlanIndicator {
    Unknown = 0b0000_0000,
    /// ISDN/telephony (E.164), the common case for mobile numbers.
    Isdn = 0b0000_0001,
    Data = 0b0000_0011,
    Telex = 0b0000_0100,
    LandMobile = 0b0000_0110,
    /// Country-specific plans; used here for national long codes.
    National = 0b0000_1000,
    Private = 0b0000_1001,
    Ermes = 0b0000_1010,
    Internet = 0b0000_1110,
    WapClientId = 0b0001_0010,
}

impl NumericPlanIndicator {
    pub fn from_wire(raw: u8) -> Self {
        Self::try_from(raw).unwrap_or(NumericPlanIndicator::Unknown)
    }
}
