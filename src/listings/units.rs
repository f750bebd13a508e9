//! Exact conversion between display amounts and base units.
//!
//! Display amounts are plain decimal strings ("0.5", "12"). Conversion is
//! integer-exact; amounts with more fractional digits than the unit allows
//! are rejected instead of rounded.

use alloy::primitives::utils::{format_units, parse_units};
use alloy::primitives::U256;

use crate::gateway::types::{GatewayError, GatewayResult};

/// Decimals of the chain's native unit (wei per ether).
pub const DEFAULT_DECIMALS: u8 = 18;

/// Convert a display amount to base units.
pub fn to_base_units(amount: &str, decimals: u8) -> GatewayResult<U256> {
    let amount = amount.trim();
    let invalid = |why: &str| GatewayError::InvalidInput(format!("amount '{}' {}", amount, why));

    if amount.is_empty() {
        return Err(invalid("is empty"));
    }

    let (whole, fraction) = match amount.split_once('.') {
        Some((w, f)) => (w, f),
        None => (amount, ""),
    };
    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid("has no digits"));
    }
    if !whole.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit()) {
        return Err(invalid("is not a plain non-negative decimal number"));
    }
    if fraction.len() > decimals as usize {
        return Err(invalid(&format!(
            "has more than {} fractional digits",
            decimals
        )));
    }

    let normalized = format!(
        "{}.{}",
        if whole.is_empty() { "0" } else { whole },
        if fraction.is_empty() { "0" } else { fraction }
    );

    parse_units(&normalized, decimals)
        .map(|parsed| parsed.get_absolute())
        .map_err(|e| invalid(&format!("cannot be converted: {}", e)))
}

/// Convert base units to a display amount, trimming trailing zeros but
/// keeping at least one fractional digit ("1.0", "0.5").
pub fn to_display_units(value: U256, decimals: u8) -> GatewayResult<String> {
    let formatted = format_units(value, decimals)
        .map_err(|e| GatewayError::InvalidInput(format!("cannot format {}: {}", value, e)))?;

    let Some((whole, fraction)) = formatted.split_once('.') else {
        return Ok(format!("{}.0", formatted));
    };
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        Ok(format!("{}.0", whole))
    } else {
        Ok(format!("{}.{}", whole, fraction))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_ether() {
        let base = to_base_units("0.5", DEFAULT_DECIMALS).unwrap();
        assert_eq!(base.to_string(), "500000000000000000");
        assert_eq!(to_display_units(base, DEFAULT_DECIMALS).unwrap(), "0.5");
    }

    #[test]
    fn test_whole_amounts() {
        let base = to_base_units("1.0", DEFAULT_DECIMALS).unwrap();
        assert_eq!(base, U256::from(10u64).pow(U256::from(18)));
        assert_eq!(to_base_units("1", DEFAULT_DECIMALS).unwrap(), base);
        assert_eq!(to_display_units(base, DEFAULT_DECIMALS).unwrap(), "1.0");
    }

    #[test]
    fn test_smallest_denomination_is_exact() {
        let base = to_base_units("0.000000000000000001", DEFAULT_DECIMALS).unwrap();
        assert_eq!(base, U256::from(1));
        assert_eq!(
            to_display_units(base, DEFAULT_DECIMALS).unwrap(),
            "0.000000000000000001"
        );
    }

    #[test]
    fn test_beyond_float_precision() {
        // 2^53 + 1 ether does not survive an f64 round trip.
        let amount = "9007199254740993.123456789012345678";
        let base = to_base_units(amount, DEFAULT_DECIMALS).unwrap();
        assert_eq!(to_display_units(base, DEFAULT_DECIMALS).unwrap(), amount);
    }

    #[test]
    fn test_round_trip_canonical_forms() {
        for amount in ["0.1", "0.25", "3.0", "42.000000000000000042", "1000000.5"] {
            let base = to_base_units(amount, DEFAULT_DECIMALS).unwrap();
            assert_eq!(to_display_units(base, DEFAULT_DECIMALS).unwrap(), amount);
        }
    }

    #[test]
    fn test_leading_dot() {
        assert_eq!(
            to_base_units(".5", DEFAULT_DECIMALS).unwrap(),
            to_base_units("0.5", DEFAULT_DECIMALS).unwrap()
        );
    }

    #[test]
    fn test_rejects_malformed() {
        for amount in ["", ".", "-1", "1e18", "NaN", "inf", "1.2.3", "abc", " 1 0"] {
            assert!(
                matches!(to_base_units(amount, DEFAULT_DECIMALS), Err(GatewayError::InvalidInput(_))),
                "{amount:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_rejects_excess_precision() {
        let result = to_base_units("0.0000000000000000001", DEFAULT_DECIMALS);
        assert!(matches!(result, Err(GatewayError::InvalidInput(_))));
    }

    #[test]
    fn test_other_decimals() {
        let base = to_base_units("1.5", 6).unwrap();
        assert_eq!(base, U256::from(1_500_000u64));
        assert_eq!(to_display_units(base, 6).unwrap(), "1.5");
    }
}
