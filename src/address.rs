//! Address classification: derives the canonical string form and the
//! TON/NPI pair from a raw source or destination address.
//!
//! Numbers without an international prefix are interpreted against the
//! default region (France): country code 33, trunk prefix `0`, 9-digit
//! national significant numbers. Anything that does not look like a phone
//! number at all is an alphanumeric sender identity.

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

use crate::datatypes::{NumericPlanIndicator, TypeOfNumber};

const REGION_COUNTRY_CODE: &str = "33";
const REGION_TRUNK_PREFIX: char = '0';
const REGION_NSN_LEN: usize = 9;

static INTERNATIONAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\+|00)[0-9]{11,}$").expect("valid pattern"));
static NATIONAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{9,}$").expect("valid pattern"));
static SHORTCODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{3,8}$").expect("valid pattern"));

/// An immutable, classified SMPP address.
#[derive(Clone, Debug)]
pub struct Address {
    raw: String,
    number: Option<ParsedNumber>,
}

/// Canonical renderings of an input that parsed as a phone number.
#[derive(Clone, Debug)]
struct ParsedNumber {
    /// `+<cc><nsn>` form.
    e164: String,
    /// Digits-only national form, with the trunk prefix restored for
    /// full-length national numbers.
    cleaned: String,
}

impl Address {
    /// Parses and classifies an address. Total: inputs that are not phone
    /// numbers come back as alphanumeric.
    pub fn parse(addr: &str) -> Self {
        let raw = addr.trim().to_owned();
        let number = parse_number(&raw);
        Self { raw, number }
    }

    pub fn is_alphanumeric(&self) -> bool {
        self.number.is_none() || self.raw.chars().count() < 3
    }

    pub fn is_international(&self) -> bool {
        !self.is_alphanumeric() && INTERNATIONAL.is_match(&self.raw)
    }

    pub fn is_national(&self) -> bool {
        !self.is_alphanumeric() && !self.is_international() && NATIONAL.is_match(self.cleaned())
    }

    pub fn is_short_code(&self) -> bool {
        !self.is_alphanumeric() && SHORTCODE.is_match(self.cleaned())
    }

    pub fn is_long_code(&self) -> bool {
        !self.is_alphanumeric() && (self.is_international() || self.is_national())
    }

    pub fn ton(&self) -> TypeOfNumber {
        if self.is_international() {
            TypeOfNumber::International
        } else if self.is_national() {
            TypeOfNumber::National
        } else if self.is_short_code() {
            TypeOfNumber::NetworkSpecific
        } else if self.is_alphanumeric() {
            TypeOfNumber::Alphanumeric
        } else {
            TypeOfNumber::Unknown
        }
    }

    pub fn npi(&self) -> NumericPlanIndicator {
        if self.is_international() {
            NumericPlanIndicator::Isdn
        } else if self.is_national() {
            NumericPlanIndicator::National
        } else {
            NumericPlanIndicator::Unknown
        }
    }

    fn cleaned(&self) -> &str {
        match &self.number {
            Some(number) => &number.cleaned,
            None => &self.raw,
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(number) = &self.number else {
            return f.write_str(&self.raw); // alphanumeric
        };

        if self.is_international() {
            f.write_str(&number.e164)
        } else {
            f.write_str(&number.cleaned)
        }
    }
}

/// Attempts to read the input as a phone number: optional `+`/`00` prefix,
/// then digits, with common separators ignored.
fn parse_number(raw: &str) -> Option<ParsedNumber> {
    let digits: String = raw
        .chars()
        .filter(|c| !matches!(c, ' ' | '.' | '-' | '(' | ')' | '/'))
        .collect();

    let (prefixed, rest) = match digits.strip_prefix('+') {
        Some(rest) => (true, rest),
        None => match digits.strip_prefix("00") {
            Some(rest) => (true, rest),
            None => (false, digits.as_str()),
        },
    };

    if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let (e164, nsn) = if prefixed {
        match rest.strip_prefix(REGION_COUNTRY_CODE) {
            // Default-region number: drop a redundant trunk prefix after
            // the country code so "+330600000001" and "+33600000001"
            // canonicalize identically.
            Some(national) => {
                let nsn = national.strip_prefix(REGION_TRUNK_PREFIX).unwrap_or(national);
                (format!("+{REGION_COUNTRY_CODE}{nsn}"), nsn)
            }
            None => (format!("+{rest}"), rest),
        }
    } else {
        let nsn = rest.strip_prefix(REGION_TRUNK_PREFIX).unwrap_or(rest);
        (format!("+{REGION_COUNTRY_CODE}{nsn}"), nsn)
    };

    let cleaned = if nsn.len() == REGION_NSN_LEN {
        format!("{REGION_TRUNK_PREFIX}{nsn}")
    } else {
        nsn.to_owned()
    };

    Some(ParsedNumber { e164, cleaned })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Case {
        raw: &'static str,
        formatted: &'static str,
        national: bool,
        international: bool,
        long: bool,
        short: bool,
        alpha: bool,
        ton: TypeOfNumber,
        npi: NumericPlanIndicator,
    }

    #[test]
    fn classification_table() {
        let cases = [
            Case {
                raw: "+33600000001",
                formatted: "+33600000001",
                national: false,
                international: true,
                long: true,
                short: false,
                alpha: false,
                ton: TypeOfNumber::International,
                npi: NumericPlanIndicator::Isdn,
            },
            Case {
                raw: "0033600000001",
                formatted: "+33600000001",
                national: false,
                international: true,
                long: true,
                short: false,
                alpha: false,
                ton: TypeOfNumber::International,
                npi: NumericPlanIndicator::Isdn,
            },
            Case {
                raw: "+330600000001",
                formatted: "+33600000001",
                national: false,
                international: true,
                long: true,
                short: false,
                alpha: false,
                ton: TypeOfNumber::International,
                npi: NumericPlanIndicator::Isdn,
            },
            Case {
                raw: "GOPHER",
                formatted: "GOPHER",
                national: false,
                international: false,
                long: false,
                short: false,
                alpha: true,
                ton: TypeOfNumber::Alphanumeric,
                npi: NumericPlanIndicator::Unknown,
            },
            Case {
                raw: "12",
                formatted: "12",
                national: false,
                international: false,
                long: false,
                short: false,
                alpha: true,
                ton: TypeOfNumber::Alphanumeric,
                npi: NumericPlanIndicator::Unknown,
            },
            Case {
                raw: "123",
                formatted: "123",
                national: false,
                international: false,
                long: false,
                short: true,
                alpha: false,
                ton: TypeOfNumber::NetworkSpecific,
                npi: NumericPlanIndicator::Unknown,
            },
            Case {
                raw: "12345678",
                formatted: "12345678",
                national: false,
                international: false,
                long: false,
                short: true,
                alpha: false,
                ton: TypeOfNumber::NetworkSpecific,
                npi: NumericPlanIndicator::Unknown,
            },
            Case {
                raw: "123456789",
                formatted: "0123456789",
                national: true,
                international: false,
                long: true,
                short: false,
                alpha: false,
                ton: TypeOfNumber::National,
                npi: NumericPlanIndicator::National,
            },
            Case {
                raw: "0600000001",
                formatted: "0600000001",
                national: true,
                international: false,
                long: true,
                short: false,
                alpha: false,
                ton: TypeOfNumber::National,
                npi: NumericPlanIndicator::National,
            },
        ];

        for case in cases {
            let addr = Address::parse(case.raw);
            assert_eq!(addr.to_string(), case.formatted, "{}", case.raw);
            assert_eq!(addr.is_national(), case.national, "{}", case.raw);
            assert_eq!(addr.is_international(), case.international, "{}", case.raw);
            assert_eq!(addr.is_long_code(), case.long, "{}", case.raw);
            assert_eq!(addr.is_short_code(), case.short, "{}", case.raw);
            assert_eq!(addr.is_alphanumeric(), case.alpha, "{}", case.raw);
            assert_eq!(addr.ton(), case.ton, "{}", case.raw);
            assert_eq!(addr.npi(), case.npi, "{}", case.raw);
        }
    }

    #[test]
    fn canonical_form_is_idempotent() {
        for raw in [
            "+33600000001",
            "0033600000001",
            "+330600000001",
            "GOPHER",
            "12",
            "123",
            "12345678",
            "123456789",
            "0600000001",
            "06 00 00 00 01",
        ] {
            let once = Address::parse(raw).to_string();
            let twice = Address::parse(&once).to_string();
            assert_eq!(once, twice, "{raw}");
        }
    }

    #[test]
    fn separators_are_ignored() {
        let addr = Address::parse("06 00 00 00 01");
        assert!(addr.is_national());
        assert_eq!(addr.to_string(), "0600000001");
    }

    #[test]
    fn whitespace_is_trimmed() {
        let addr = Address::parse("  +33600000001  ");
        assert!(addr.is_international());
        assert_eq!(addr.to_string(), "+33600000001");
    }
}
