//! Arbitrary-precision quantity parsing/formatting and decimal unit conversion.
//!
//! Quantities are `U256` values. On the wire they are always `0x`-prefixed
//! hex strings; for humans they are decimal strings scaled by a unit
//! exponent (18 for ether, 9 for gwei, 6 for most stablecoins).

use std::fmt;
use std::str::FromStr;

use alloy_primitives::U256;

use crate::error::EthError;

/// 10^77 is the largest power of ten that fits in 256 bits.
pub const MAX_DECIMALS: u8 = 77;

/// Named denominations of ether, or an arbitrary decimal exponent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Wei,
    Kwei,
    Mwei,
    Gwei,
    Szabo,
    Finney,
    Ether,
    Decimals(u8),
}

impl Unit {
    /// Number of decimal places this unit shifts by.
    pub fn exponent(&self) -> u8 {
        match self {
            Unit::Wei => 0,
            Unit::Kwei => 3,
            Unit::Mwei => 6,
            Unit::Gwei => 9,
            Unit::Szabo => 12,
            Unit::Finney => 15,
            Unit::Ether => 18,
            Unit::Decimals(d) => *d,
        }
    }
}

impl From<u8> for Unit {
    fn from(decimals: u8) -> Self {
        Unit::Decimals(decimals)
    }
}

impl FromStr for Unit {
    type Err = EthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "wei" => Ok(Unit::Wei),
            "kwei" => Ok(Unit::Kwei),
            "mwei" => Ok(Unit::Mwei),
            "gwei" => Ok(Unit::Gwei),
            "szabo" => Ok(Unit::Szabo),
            "finney" => Ok(Unit::Finney),
            "ether" | "eth" => Ok(Unit::Ether),
            other => other
                .parse::<u8>()
                .map(Unit::Decimals)
                .map_err(|_| EthError::MalformedNumber(format!("unknown unit: {s}"))),
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unit::Wei => f.write_str("wei"),
            Unit::Kwei => f.write_str("kwei"),
            Unit::Mwei => f.write_str("mwei"),
            Unit::Gwei => f.write_str("gwei"),
            Unit::Szabo => f.write_str("szabo"),
            Unit::Finney => f.write_str("finney"),
            Unit::Ether => f.write_str("ether"),
            Unit::Decimals(d) => write!(f, "{d} decimals"),
        }
    }
}

/// Parses an unsigned integer written in `base` (10 or 16).
///
/// A `0x` prefix is accepted for base 16. Empty input, stray characters and
/// signs are rejected with [`EthError::MalformedNumber`]; values that do not
/// fit in 256 bits with [`EthError::NumericOverflow`].
pub fn parse(text: &str, base: u32) -> Result<U256, EthError> {
    if base != 10 && base != 16 {
        return Err(EthError::MalformedNumber(format!("unsupported base {base}")));
    }

    let digits = if base == 16 {
        text.strip_prefix("0x")
            .or_else(|| text.strip_prefix("0X"))
            .unwrap_or(text)
    } else {
        text
    };

    if digits.is_empty() {
        return Err(EthError::MalformedNumber(format!("empty number: {text:?}")));
    }

    let radix = U256::from(base);
    let mut value = U256::ZERO;
    for c in digits.chars() {
        let digit = c.to_digit(base).ok_or_else(|| {
            EthError::MalformedNumber(format!("invalid digit {c:?} in {text:?}"))
        })?;
        value = value
            .checked_mul(radix)
            .and_then(|v| v.checked_add(U256::from(digit)))
            .ok_or_else(|| EthError::NumericOverflow(format!("{text} exceeds 256 bits")))?;
    }

    Ok(value)
}

/// Parses either a `0x` hex quantity or a plain decimal string.
pub fn parse_quantity(text: &str) -> Result<U256, EthError> {
    if text.starts_with("0x") || text.starts_with("0X") {
        parse(text, 16)
    } else {
        parse(text, 10)
    }
}

/// Parses a hex quantity that must fit in a `u64` (block numbers, nonces,
/// log indices, chain ids).
pub fn parse_u64(text: &str) -> Result<u64, EthError> {
    let value = parse_quantity(text)?;
    u64::try_from(value).map_err(|_| EthError::NumericOverflow(format!("{text} exceeds u64")))
}

/// Canonical JSON-RPC quantity encoding: `0x` + hex digits without leading
/// zeros, `0x0` for zero.
pub fn to_hex_quantity(value: U256) -> String {
    if value.is_zero() {
        return "0x0".to_string();
    }
    let bytes = value.to_be_bytes::<32>();
    let hex = hex::encode(bytes);
    format!("0x{}", hex.trim_start_matches('0'))
}

/// Renders `value / 10^unit` as `integer.fraction`.
///
/// Trailing zeros of the fraction are trimmed, but at least one fractional
/// digit is always kept (`1000000000 wei` in gwei is `"1.0"`).
pub fn format_units(value: U256, unit: impl Into<Unit>) -> Result<String, EthError> {
    let decimals = checked_decimals(unit.into())?;
    let digits = value.to_string();

    let (int_part, frac_part) = if digits.len() > decimals {
        let split = digits.len() - decimals;
        (digits[..split].to_string(), digits[split..].to_string())
    } else {
        let padded = format!("{digits:0>decimals$}");
        ("0".to_string(), padded)
    };

    let trimmed = frac_part.trim_end_matches('0');
    let frac = if trimmed.is_empty() { "0" } else { trimmed };

    Ok(format!("{int_part}.{frac}"))
}

/// Parses a decimal string scaled by `10^unit`.
///
/// `"1.5"` in gwei is `1500000000`. More fractional digits than the unit
/// allows is a [`EthError::PrecisionOverflow`]; anything that is not
/// `digits[.digits]` is a [`EthError::MalformedNumber`].
pub fn parse_units(text: &str, unit: impl Into<Unit>) -> Result<U256, EthError> {
    let decimals = checked_decimals(unit.into())?;

    let (int_part, frac_part) = match text.split_once('.') {
        Some((int_part, frac_part)) => {
            if frac_part.is_empty() {
                return Err(EthError::MalformedNumber(format!(
                    "missing fractional digits in {text:?}"
                )));
            }
            (int_part, frac_part)
        }
        None => (text, ""),
    };

    if int_part.is_empty() {
        return Err(EthError::MalformedNumber(format!(
            "missing integer digits in {text:?}"
        )));
    }
    if !int_part.chars().all(|c| c.is_ascii_digit())
        || !frac_part.chars().all(|c| c.is_ascii_digit())
    {
        return Err(EthError::MalformedNumber(format!("invalid decimal {text:?}")));
    }
    // Zeros past the unit's precision carry no value.
    let frac_part = match frac_part.get(decimals..) {
        Some(excess) if excess.bytes().all(|b| b == b'0') => &frac_part[..decimals],
        Some(_) => {
            return Err(EthError::PrecisionOverflow(format!(
                "{text} has {} fractional digits, unit allows {decimals}",
                frac_part.trim_end_matches('0').len()
            )))
        }
        None => frac_part,
    };

    let scaled = format!("{int_part}{frac_part:0<decimals$}");
    parse(&scaled, 10)
}

/// `format_units(value, Unit::Ether)`.
pub fn format_ether(value: U256) -> String {
    // 18 is always within MAX_DECIMALS.
    format_units(value, Unit::Ether).unwrap_or_default()
}

/// `parse_units(text, Unit::Ether)`.
pub fn parse_ether(text: &str) -> Result<U256, EthError> {
    parse_units(text, Unit::Ether)
}

fn checked_decimals(unit: Unit) -> Result<usize, EthError> {
    let decimals = unit.exponent();
    if decimals > MAX_DECIMALS {
        return Err(EthError::PrecisionOverflow(format!(
            "{decimals} decimals exceeds the maximum of {MAX_DECIMALS}"
        )));
    }
    Ok(decimals as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_decimal_and_hex() {
        assert_eq!(parse("1000000000", 10).unwrap(), U256::from(1_000_000_000u64));
        assert_eq!(parse("0x3b9aca00", 16).unwrap(), U256::from(1_000_000_000u64));
        assert_eq!(parse("3B9ACA00", 16).unwrap(), U256::from(1_000_000_000u64));
    }

    #[test]
    fn parse_rejects_empty_and_garbage() {
        assert!(matches!(parse("", 10), Err(EthError::MalformedNumber(_))));
        assert!(matches!(parse("0x", 16), Err(EthError::MalformedNumber(_))));
        assert!(matches!(parse("12a", 10), Err(EthError::MalformedNumber(_))));
        assert!(matches!(parse("-1", 10), Err(EthError::MalformedNumber(_))));
        assert!(matches!(parse("1_000", 10), Err(EthError::MalformedNumber(_))));
    }

    #[test]
    fn parse_rejects_values_beyond_256_bits() {
        let max = "0x".to_string() + &"f".repeat(64);
        assert_eq!(parse(&max, 16).unwrap(), U256::MAX);

        let too_big = "0x1".to_string() + &"0".repeat(64);
        assert!(matches!(parse(&too_big, 16), Err(EthError::NumericOverflow(_))));
    }

    #[test]
    fn parse_u64_bounds() {
        assert_eq!(parse_u64("0x10").unwrap(), 16);
        assert!(matches!(
            parse_u64("0x10000000000000000"),
            Err(EthError::NumericOverflow(_))
        ));
    }

    #[test]
    fn hex_quantity_has_no_leading_zeros() {
        assert_eq!(to_hex_quantity(U256::ZERO), "0x0");
        assert_eq!(to_hex_quantity(U256::from(1000u64)), "0x3e8");
        assert_eq!(to_hex_quantity(U256::from(0x0100u64)), "0x100");
        assert_eq!(to_hex_quantity(U256::MAX), format!("0x{}", "f".repeat(64)));
    }

    #[test]
    fn format_gwei_and_ether() {
        let one_gwei = U256::from(1_000_000_000u64);
        assert_eq!(format_units(one_gwei, Unit::Gwei).unwrap(), "1.0");
        assert_eq!(format_units(one_gwei, Unit::Ether).unwrap(), "0.000000001");
        assert_eq!(format_ether(one_gwei), "0.000000001");
        assert_eq!(format_ether(U256::ZERO), "0.0");
    }

    #[test]
    fn format_with_custom_decimals() {
        // 1.5 USDT (6 decimals)
        assert_eq!(format_units(U256::from(1_500_000u64), 6u8).unwrap(), "1.5");
        assert_eq!(format_units(U256::from(42u64), 0u8).unwrap(), "42.0");
    }

    #[test]
    fn format_max_value_keeps_every_digit() {
        let formatted = format_units(U256::MAX, Unit::Ether).unwrap();
        assert_eq!(
            formatted,
            "115792089237316195423570985008687907853269984665640564039457.584007913129639935"
        );
    }

    #[test]
    fn parse_units_scales() {
        assert_eq!(
            parse_units("1.0", Unit::Ether).unwrap(),
            U256::from(1_000_000_000_000_000_000u128)
        );
        assert_eq!(parse_units("1.0", Unit::Gwei).unwrap(), U256::from(1_000_000_000u64));
        assert_eq!(parse_ether("0.001").unwrap(), U256::from(1_000_000_000_000_000u64));
        assert_eq!(parse_units("42", 0u8).unwrap(), U256::from(42u64));
    }

    #[test]
    fn parse_units_rejects_excess_precision() {
        assert!(matches!(
            parse_units("1.0000000001", Unit::Gwei),
            Err(EthError::PrecisionOverflow(_))
        ));
        assert!(matches!(
            parse_units("0.1", 0u8),
            Err(EthError::PrecisionOverflow(_))
        ));
    }

    #[test]
    fn zeros_beyond_precision_are_accepted() {
        assert_eq!(parse_units("1.50", 1u8).unwrap(), U256::from(15));
        assert_eq!(parse_units("2.000", Unit::Wei).unwrap(), U256::from(2));
        assert!(matches!(
            parse_units("1.501", 1u8),
            Err(EthError::PrecisionOverflow(_))
        ));

        for decimals in [0u8, 1] {
            let text = format_units(U256::from(42), decimals).unwrap();
            assert_eq!(parse_units(&text, decimals).unwrap(), U256::from(42));
        }
    }

    #[test]
    fn parse_units_rejects_bad_syntax() {
        for bad in ["", ".5", "1.", "1.2.3", "abc", "-1.0", "1e18", " 1"] {
            assert!(
                matches!(parse_units(bad, Unit::Ether), Err(EthError::MalformedNumber(_))),
                "{bad:?} should be malformed"
            );
        }
    }

    #[test]
    fn round_trip_canonical_decimals() {
        for s in [
            "0.0",
            "1.0",
            "0.000000000000000001",
            "123456789.123456789123456789",
            "1.5",
            "1000000.25",
        ] {
            let wei = parse_units(s, Unit::Ether).unwrap();
            assert_eq!(format_units(wei, Unit::Ether).unwrap(), s);
        }
    }

    #[test]
    fn unit_names_parse() {
        assert_eq!("gwei".parse::<Unit>().unwrap(), Unit::Gwei);
        assert_eq!("Ether".parse::<Unit>().unwrap(), Unit::Ether);
        assert_eq!("6".parse::<Unit>().unwrap(), Unit::Decimals(6));
        assert!("lamports".parse::<Unit>().is_err());
    }

    #[test]
    fn decimals_beyond_range_are_rejected() {
        assert!(matches!(
            format_units(U256::from(1u64), 78u8),
            Err(EthError::PrecisionOverflow(_))
        ));
    }
}
