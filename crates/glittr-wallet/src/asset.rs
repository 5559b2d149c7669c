//! Asset identifiers and raw amount handling.
//!
//! Amounts are always raw integers. Divisibility is only applied when an
//! amount is rendered for display or typed in by a user.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AmountError, AssetIdError};

/// Separator between the block and transaction index parts.
pub const ASSET_ID_SEPARATOR: char = ':';

/// Location of the transaction that defines an asset contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AssetId {
    pub block: u64,
    pub tx_index: u32,
}

impl AssetId {
    #[must_use]
    pub const fn new(block: u64, tx_index: u32) -> Self {
        Self { block, tx_index }
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{ASSET_ID_SEPARATOR}{}", self.block, self.tx_index)
    }
}

impl FromStr for AssetId {
    type Err = AssetIdError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let mut parts = input.trim().split(ASSET_ID_SEPARATOR);
        let (Some(block), Some(tx_index), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(AssetIdError::InvalidFormat {
                input: input.to_string(),
            });
        };

        let block = parse_digits(block).ok_or_else(|| AssetIdError::InvalidPart {
            input: input.to_string(),
            part: "block",
        })?;
        let tx_index = parse_digits(tx_index).ok_or_else(|| AssetIdError::InvalidPart {
            input: input.to_string(),
            part: "txIndex",
        })?;

        Ok(Self { block, tx_index })
    }
}

impl TryFrom<String> for AssetId {
    type Error = AssetIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AssetId> for String {
    fn from(value: AssetId) -> Self {
        value.to_string()
    }
}

/// `str::parse` accepts a leading `+`, the wire format does not.
fn parse_digits<T: FromStr>(part: &str) -> Option<T> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}

/// Parse a raw integer amount as returned by the balance index.
pub fn parse_raw_amount(input: &str) -> Result<u128, AmountError> {
    parse_amount(input, 0)
}

/// Convert a user-facing decimal amount into raw units.
///
/// ```
/// use glittr_wallet::parse_amount;
///
/// assert_eq!(parse_amount("12.5", 2).unwrap(), 1250);
/// assert_eq!(parse_amount("7", 0).unwrap(), 7);
/// ```
pub fn parse_amount(input: &str, divisibility: u8) -> Result<u128, AmountError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(AmountError::Empty);
    }

    let (integer, fraction) = trimmed.split_once('.').unwrap_or((trimmed, ""));
    let digits_only = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if !digits_only(integer) || !digits_only(fraction) || integer.len() + fraction.len() == 0 {
        return Err(AmountError::InvalidDigits(input.to_string()));
    }

    if fraction.len() > usize::from(divisibility) {
        return Err(AmountError::TooPrecise {
            input: input.to_string(),
            divisibility,
        });
    }

    let mut raw = String::with_capacity(integer.len() + usize::from(divisibility));
    raw.push_str(integer);
    raw.push_str(fraction);
    raw.extend(std::iter::repeat_n('0', usize::from(divisibility) - fraction.len()));

    let significant = raw.trim_start_matches('0');
    if significant.is_empty() {
        return Ok(0);
    }

    significant
        .parse::<u128>()
        .map_err(|_| AmountError::Overflow(input.to_string()))
}

/// Render a raw amount with `divisibility` fractional digits, trailing zeros trimmed.
///
/// ```
/// use glittr_wallet::format_amount;
///
/// assert_eq!(format_amount(1250, 2), "12.5");
/// assert_eq!(format_amount(1200, 2), "12");
/// ```
#[must_use]
pub fn format_amount(raw: u128, divisibility: u8) -> String {
    let digits = raw.to_string();
    let scale = usize::from(divisibility);
    if scale == 0 {
        return digits;
    }

    let padded = if digits.len() <= scale {
        format!("{}{digits}", "0".repeat(scale + 1 - digits.len()))
    } else {
        digits
    };

    let (integer, fraction) = padded.split_at(padded.len() - scale);
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        integer.to_string()
    } else {
        format!("{integer}.{fraction}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_id_parses_and_displays() {
        let id: AssetId = "5000:12".parse().expect("valid id");
        assert_eq!(id, AssetId::new(5000, 12));
        assert_eq!(id.to_string(), "5000:12");
    }

    #[test]
    fn asset_id_rejects_malformed_input() {
        for input in ["5000", "5000:12:1", ":12", "5000:", "a:1", "1:-2", "+1:2", ""] {
            let err = input.parse::<AssetId>().expect_err(input);
            assert!(err.to_string().contains("Invalid asset id"), "{input}: {err}");
        }
    }

    #[test]
    fn asset_id_serde_uses_string_form() {
        let id = AssetId::new(7, 3);
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, "\"7:3\"");

        let back: AssetId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, id);

        serde_json::from_str::<AssetId>("\"7-3\"").expect_err("separator is ':'");
    }

    #[test]
    fn asset_ids_order_by_block_then_index() {
        let mut ids = vec![AssetId::new(10, 1), AssetId::new(2, 9), AssetId::new(10, 0)];
        ids.sort();
        assert_eq!(
            ids,
            vec![AssetId::new(2, 9), AssetId::new(10, 0), AssetId::new(10, 1)]
        );
    }

    #[test]
    fn format_amount_applies_divisibility() {
        assert_eq!(format_amount(0, 0), "0");
        assert_eq!(format_amount(0, 8), "0");
        assert_eq!(format_amount(5, 3), "0.005");
        assert_eq!(format_amount(123_456, 3), "123.456");
        assert_eq!(format_amount(100_000, 3), "100");
        assert_eq!(format_amount(u128::MAX, 0), u128::MAX.to_string());
    }

    #[test]
    fn parse_amount_is_inverse_of_format() {
        assert_eq!(parse_amount("0.005", 3).expect("valid"), 5);
        assert_eq!(parse_amount("123.456", 3).expect("valid"), 123_456);
        assert_eq!(parse_amount("100", 3).expect("valid"), 100_000);
        assert_eq!(parse_amount(".5", 1).expect("valid"), 5);
        assert_eq!(parse_amount("000", 0).expect("valid"), 0);
    }

    #[test]
    fn parse_amount_rejects_bad_input() {
        assert_eq!(parse_amount("  ", 2), Err(AmountError::Empty));
        assert!(matches!(
            parse_amount("1.234", 2),
            Err(AmountError::TooPrecise { divisibility: 2, .. })
        ));
        assert!(matches!(
            parse_amount("1.5", 0),
            Err(AmountError::TooPrecise { .. })
        ));
        for bad in ["-1", "+1", "1e3", "1.2.3", ".", "12a"] {
            assert!(
                matches!(parse_amount(bad, 4), Err(AmountError::InvalidDigits(_))),
                "{bad}"
            );
        }
        let too_big = format!("{}0", u128::MAX);
        assert!(matches!(
            parse_raw_amount(&too_big),
            Err(AmountError::Overflow(_))
        ));
    }
}
