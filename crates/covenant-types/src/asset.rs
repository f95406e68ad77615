//! Asset and fixed-point conventions for Covenant
//!
//! All amounts are raw `u128` smallest units. The externally reported price
//! arrives with 8 decimals and is rescaled to 18 with [`PRECISION_SCALE`];
//! conversions use truncating integer division, never floating point.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One whole native unit in raw smallest units (18 decimals)
pub const ONE_UNIT: u128 = 1_000_000_000_000_000_000;

/// Fixed-point scale applied to oracle-reported prices (8 -> 18 decimals)
pub const PRECISION_SCALE: u128 = 10_000_000_000;

/// The fungible assets a ledger account can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Asset {
    /// The native value asset; deposits and premiums are paid in it
    Native,
    /// The secondary stable asset used for stablecoin-denominated settlement
    Stable,
    /// The payment asset that funds oracle requests
    OracleFee,
}

impl Asset {
    /// Get the standard decimal places for this asset
    pub fn decimals(&self) -> u8 {
        18
    }

    /// Get the symbolic code
    pub fn code(&self) -> &'static str {
        match self {
            Self::Native => "NATIVE",
            Self::Stable => "STABLE",
            Self::OracleFee => "ORACLE_FEE",
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Convert an oracle-reported raw price into the derived transfer amount
///
/// `transfer_amount = raw_value * PRECISION_SCALE * deposit / ONE_UNIT`,
/// in checked `u128` arithmetic with truncating division. The product is
/// reassociated as `raw_value * deposit / (ONE_UNIT / PRECISION_SCALE)` —
/// bit-identical (equal rationals truncate equally, and the divisor divides
/// ONE_UNIT exactly) while keeping the intermediate inside `u128`.
pub fn derived_transfer_amount(raw_value: u128, deposit: u128) -> crate::Result<u128> {
    let scaled = raw_value
        .checked_mul(deposit)
        .ok_or(crate::CovenantError::AmountOverflow)?;
    Ok(scaled / (ONE_UNIT / PRECISION_SCALE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_unit_at_price() {
        // 1 native unit at a raw 8-decimal price of 2000_00000000
        // settles for 2000 stable units.
        let raw_price = 2_000u128 * 100_000_000;
        let out = derived_transfer_amount(raw_price, ONE_UNIT).unwrap();
        assert_eq!(out, 2_000 * ONE_UNIT);
    }

    #[test]
    fn test_fractional_deposit_truncates() {
        // A 1-wei deposit at a price below PRECISION_SCALE truncates to zero.
        let out = derived_transfer_amount(3, 1).unwrap();
        assert_eq!(out, 3 * PRECISION_SCALE / ONE_UNIT);
        assert_eq!(out, 0);
    }

    #[test]
    fn test_reassociation_matches_literal_formula() {
        // Where the literal product fits, the reassociated form agrees.
        for (raw, deposit) in [(12_345u128, 98_765u128), (1, 1), (99_999_999, 7)] {
            let literal = raw * PRECISION_SCALE * deposit / ONE_UNIT;
            assert_eq!(derived_transfer_amount(raw, deposit).unwrap(), literal);
        }
    }

    #[test]
    fn test_large_realistic_values_do_not_overflow() {
        // A 2000.00000000 quote against a full 18-decimal deposit would
        // overflow the literal triple product; the reassociated form holds.
        let raw_price = 2_000u128 * 100_000_000;
        let out = derived_transfer_amount(raw_price, ONE_UNIT).unwrap();
        assert_eq!(out, 2_000 * ONE_UNIT);
    }

    #[test]
    fn test_overflow_is_explicit() {
        let result = derived_transfer_amount(u128::MAX, 2);
        assert!(matches!(result, Err(crate::CovenantError::AmountOverflow)));
    }

    #[test]
    fn test_asset_codes() {
        assert_eq!(Asset::Native.code(), "NATIVE");
        assert_eq!(Asset::Stable.to_string(), "STABLE");
        assert_eq!(Asset::OracleFee.decimals(), 18);
    }
}
