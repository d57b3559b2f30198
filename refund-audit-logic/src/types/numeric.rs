//! Mixed integer/hex handling at the RPC boundary (design note, section 9): never mix raw
//! strings and integers downstream of [`HexOrDecimal::normalise`].

use ethers_core::types::U256;
use serde::{Deserialize, Serialize};

/// A numeric RPC field that may arrive as a decimal JSON number or a `0x`-prefixed hex
/// string, and must be normalised to a canonical hex form before any arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HexOrDecimal {
    Decimal(u64),
    Hex(String),
}

impl HexOrDecimal {
    /// Canonical form: a `U256`. Normalisation is idempotent:
    /// `normalise(normalise(x)) == normalise(x)`.
    pub fn normalise(&self) -> Result<U256, ParseNumericError> {
        match self {
            HexOrDecimal::Decimal(n) => Ok(U256::from(*n)),
            HexOrDecimal::Hex(s) => parse_hex_or_decimal(s),
        }
    }
}

/// Renders a `U256` as a canonical lowercase `0x`-prefixed hex string with no leading
/// zeroes (beyond a single `0x0` for the zero value).
pub fn to_hex_prefixed(value: U256) -> String {
    if value.is_zero() {
        return "0x0".to_string();
    }
    format!("{value:#x}")
}

/// Accepts both `0x`-prefixed hex and bare decimal strings; always returns the `0x` form
/// downstream via [`to_hex_prefixed`]. This is the single place the RPC client normalises
/// caller-supplied integers before building a request.
pub fn parse_hex_or_decimal(s: &str) -> Result<U256, ParseNumericError> {
    let trimmed = s.trim();
    if let Some(stripped) = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        U256::from_str_radix(stripped, 16).map_err(|_| ParseNumericError(trimmed.to_string()))
    } else {
        U256::from_dec_str(trimmed).map_err(|_| ParseNumericError(trimmed.to_string()))
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("could not parse '{0}' as a hex or decimal integer")]
pub struct ParseNumericError(String);

/// Computes `0.9 * sum` on 256-bit unsigned integers as `sum * 9 / 10`, rounding toward
/// zero, to avoid float drift in refund arithmetic (design note, section 9).
pub fn ninety_percent(sum: U256) -> U256 {
    sum.saturating_mul(U256::from(9)) / U256::from(10)
}
