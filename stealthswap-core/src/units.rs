//! Decimal amount parsing and formatting.
//!
//! Amounts are integers in the asset's smallest unit. These helpers convert to and
//! from human-readable decimal strings, e.g. `"1.2"` ether → `1_200_000_000_000_000_000` wei.

use crate::error::{LedgerError, Result};
use crate::types::Amount;

/// Parses a decimal string into an integer amount with `decimals` fractional digits.
///
/// Rejects empty input, signs, more fractional digits than `decimals`, and overflow.
pub fn parse_units(value: &str, decimals: u32) -> Result<Amount> {
    let value = value.trim();
    let invalid = |why: &str| LedgerError::InvalidAmount(format!("'{value}': {why}"));

    if value.is_empty() {
        return Err(invalid("empty"));
    }

    let (whole, fraction) = match value.split_once('.') {
        Some((w, f)) => (w, f),
        None => (value, ""),
    };

    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid("no digits"));
    }
    if !whole.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit()) {
        return Err(invalid("only digits and a single '.' are allowed"));
    }
    if fraction.len() > decimals as usize {
        return Err(invalid("too many fractional digits"));
    }

    let scale = 10u128
        .checked_pow(decimals)
        .ok_or_else(|| invalid("decimals too large"))?;

    let whole_part = if whole.is_empty() {
        0
    } else {
        whole.parse::<Amount>().map_err(|_| invalid("overflow"))?
    };

    let fraction_part = if fraction.is_empty() {
        0
    } else {
        let padding = 10u128.pow(decimals - fraction.len() as u32);
        fraction.parse::<Amount>().map_err(|_| invalid("overflow"))? * padding
    };

    whole_part
        .checked_mul(scale)
        .and_then(|w| w.checked_add(fraction_part))
        .ok_or_else(|| invalid("overflow"))
}

/// Formats an integer amount as a decimal string, trimming trailing zeros.
pub fn format_units(amount: Amount, decimals: u32) -> String {
    // Past 38 decimals every u128 amount is a pure fraction.
    let (whole, fraction) = match 10u128.checked_pow(decimals) {
        Some(scale) => (amount / scale, amount % scale),
        None => (0, amount),
    };

    if fraction == 0 {
        return whole.to_string();
    }

    let digits = format!("{:0width$}", fraction, width = decimals as usize);
    format!("{}.{}", whole, digits.trim_end_matches('0'))
}

/// Serde adapter storing amounts as decimal strings of the smallest unit.
///
/// JSON numbers lose precision above 2^53 in most consumers, so amounts travel as
/// strings: `"1200000000000000000"`.
pub mod amount_string {
    use serde::{de, Deserialize, Deserializer, Serializer};

    use crate::types::Amount;

    /// Serializes an amount as a base-10 string.
    pub fn serialize<S: Serializer>(amount: &Amount, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&amount.to_string())
    }

    /// Deserializes an amount from a base-10 string.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Amount, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.trim().parse::<Amount>().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::ETHER_DECIMALS;
    use test_case::test_case;

    #[test_case("1.2", 1_200_000_000_000_000_000 ; "fractional ether")]
    #[test_case("0.1", 100_000_000_000_000_000 ; "deployed fee")]
    #[test_case("0.025", 25_000_000_000_000_000 ; "ether toll")]
    #[test_case("100", 100_000_000_000_000_000_000 ; "whole tokens")]
    #[test_case(".5", 500_000_000_000_000_000 ; "leading dot")]
    #[test_case("0.000000000000000001", 1 ; "one wei")]
    fn test_parse_ether(input: &str, expected: Amount) {
        assert_eq!(parse_units(input, ETHER_DECIMALS).unwrap(), expected);
    }

    #[test_case("" ; "empty")]
    #[test_case("." ; "dot only")]
    #[test_case("-1" ; "negative")]
    #[test_case("1.2.3" ; "two dots")]
    #[test_case("0.0000000000000000001" ; "below one wei")]
    #[test_case("1e18" ; "exponent")]
    fn test_parse_rejects(input: &str) {
        assert!(matches!(
            parse_units(input, ETHER_DECIMALS),
            Err(LedgerError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_parse_overflow() {
        let huge = "1".repeat(40);
        assert!(parse_units(&huge, ETHER_DECIMALS).is_err());
    }

    #[test]
    fn test_format_units_beyond_u128_scale() {
        assert_eq!(format_units(0, 40), "0");
        assert_eq!(format_units(15, 40), "0.0000000000000000000000000000000000000015");
        assert_eq!(format_units(1, 39), "0.000000000000000000000000000000000000001");
    }

    #[test]
    fn test_format_units() {
        assert_eq!(format_units(1_200_000_000_000_000_000, ETHER_DECIMALS), "1.2");
        assert_eq!(format_units(100_000_000_000_000_000_000, ETHER_DECIMALS), "100");
        assert_eq!(format_units(1, ETHER_DECIMALS), "0.000000000000000001");
        assert_eq!(format_units(0, ETHER_DECIMALS), "0");
    }

    proptest::proptest! {
        #[test]
        fn test_format_then_parse_is_identity(amount in 0u128..u128::MAX / 2) {
            let text = format_units(amount, ETHER_DECIMALS);
            proptest::prop_assert_eq!(parse_units(&text, ETHER_DECIMALS).unwrap(), amount);
        }
    }
}
