//! Units - exact conversion between decimal ether strings and integer wei.
//!
//! All arithmetic is fixed-point on `u128` (10^18 wei per ether). Binary
//! floating point never touches an amount.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Decimal exponent of the native asset.
pub const DECIMALS: usize = 18;

const WEI_PER_ETHER: u128 = 1_000_000_000_000_000_000;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnitError {
    #[error("amount is empty")]
    Empty,
    #[error("amount is not a decimal number: {0}")]
    NotANumber(String),
    #[error("amount must not be negative")]
    Negative,
    #[error("amount has more than {max} decimal places")]
    TooPrecise { max: usize },
    #[error("amount is too large")]
    Overflow,
}

/// Amount in minor units (wei).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Wei(u128);

impl Wei {
    pub const ZERO: Wei = Wei(0);

    pub const fn from_wei(wei: u128) -> Self {
        Self(wei)
    }

    pub const fn as_u128(&self) -> u128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Wei) -> Option<Wei> {
        self.0.checked_add(other.0).map(Wei)
    }

    pub fn saturating_add(self, other: Wei) -> Wei {
        Wei(self.0.saturating_add(other.0))
    }

    /// Parse a major-unit decimal string (`"1.5"`, `"0.000000000000000001"`, `".25"`).
    ///
    /// Digits past the 18th decimal are an error, never rounded.
    pub fn parse_ether(input: &str) -> Result<Self, UnitError> {
        let s = input.trim();
        if s.is_empty() {
            return Err(UnitError::Empty);
        }
        if s.starts_with('-') {
            return Err(UnitError::Negative);
        }

        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(UnitError::NotANumber(s.to_string()));
        }
        if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(UnitError::NotANumber(s.to_string()));
        }
        if frac.len() > DECIMALS {
            return Err(UnitError::TooPrecise { max: DECIMALS });
        }

        let whole_wei = if whole.is_empty() {
            0
        } else {
            whole
                .parse::<u128>()
                .map_err(|_| UnitError::Overflow)?
                .checked_mul(WEI_PER_ETHER)
                .ok_or(UnitError::Overflow)?
        };
        let frac_wei = if frac.is_empty() {
            0
        } else {
            let padded = format!("{:0<width$}", frac, width = DECIMALS);
            padded.parse::<u128>().map_err(|_| UnitError::NotANumber(s.to_string()))?
        };

        whole_wei.checked_add(frac_wei).map(Wei).ok_or(UnitError::Overflow)
    }

    /// Parse a JSON-RPC hex quantity (`"0x1bc16d674ec80000"`).
    pub fn from_hex_quantity(s: &str) -> Result<Self, UnitError> {
        parse_hex_u128(s).map(Wei)
    }

    pub fn to_hex_quantity(&self) -> String {
        format!("{:#x}", self.0)
    }

    /// Major-unit decimal string without trailing zeros (`"1.5"`, `"0"`).
    pub fn to_ether_string(&self) -> String {
        let whole = self.0 / WEI_PER_ETHER;
        let frac = self.0 % WEI_PER_ETHER;
        if frac == 0 {
            return whole.to_string();
        }
        let frac = format!("{:018}", frac);
        format!("{}.{}", whole, frac.trim_end_matches('0'))
    }

    /// Big-endian bytes without leading zeros (RLP integer form).
    pub fn to_be_bytes_trimmed(&self) -> Vec<u8> {
        trim_leading_zeros(&self.0.to_be_bytes())
    }
}

impl fmt::Display for Wei {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_ether_string())
    }
}

pub(crate) fn parse_hex_u128(s: &str) -> Result<u128, UnitError> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .ok_or_else(|| UnitError::NotANumber(s.to_string()))?;
    if digits.is_empty() {
        return Err(UnitError::NotANumber(s.to_string()));
    }
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(UnitError::NotANumber(s.to_string()));
    }
    let significant = digits.trim_start_matches('0');
    if significant.len() > 32 {
        return Err(UnitError::Overflow);
    }
    if significant.is_empty() {
        return Ok(0);
    }
    u128::from_str_radix(significant, 16).map_err(|_| UnitError::Overflow)
}

pub(crate) fn trim_leading_zeros(bytes: &[u8]) -> Vec<u8> {
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    bytes[first..].to_vec()
}
