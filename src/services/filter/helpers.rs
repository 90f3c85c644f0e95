//! Helper functions for comparing event field values.
//!
//! Values coming from the event server are loosely typed: amounts arrive as
//! decimal strings, addresses in mixed case, timestamps as RFC 3339 strings.
//! These helpers normalise both sides before comparison.

use alloy_primitives::U256;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use std::{cmp::Ordering, fmt, str::FromStr};

/// Decimal digits of `U256::MAX`
const MAX_U256_DIGITS: usize = 78;

/// Compares two addresses for equality, ignoring case and "0x" prefixes.
pub fn are_same_address(address1: &str, address2: &str) -> bool {
	normalize_address(address1) == normalize_address(address2)
}

/// Normalizes an address string by removing "0x" prefix, spaces, and converting to lowercase.
pub fn normalize_address(address: &str) -> String {
	let trimmed = address.trim();
	trimmed
		.strip_prefix("0x")
		.or_else(|| trimmed.strip_prefix("0X"))
		.unwrap_or(trimmed)
		.replace(' ', "")
		.to_lowercase()
}

/// Numeric field value.
///
/// Whole numbers are kept as a sign and a 256-bit magnitude so full-size
/// on-chain amounts compare exactly; values with a fractional part fall back
/// to [`Decimal`].
#[derive(Debug, Clone, Copy)]
pub enum Numeric {
	Integer { negative: bool, magnitude: U256 },
	Fraction(Decimal),
}

impl Numeric {
	fn integer(negative: bool, magnitude: U256) -> Self {
		Self::Integer {
			negative: negative && !magnitude.is_zero(),
			magnitude,
		}
	}

	/// `None` when the value lies outside the `Decimal` range.
	fn to_decimal(self) -> Option<Decimal> {
		match self {
			Self::Fraction(decimal) => Some(decimal),
			Self::Integer {
				negative,
				magnitude,
			} => {
				let magnitude = u128::try_from(magnitude).ok()?;
				let signed = i128::try_from(magnitude).ok()?;
				let signed = if negative { -signed } else { signed };
				Decimal::try_from_i128_with_scale(signed, 0).ok()
			}
		}
	}

	fn is_negative(&self) -> bool {
		match self {
			Self::Integer { negative, .. } => *negative,
			Self::Fraction(decimal) => decimal.is_sign_negative() && !decimal.is_zero(),
		}
	}
}

impl Ord for Numeric {
	fn cmp(&self, other: &Self) -> Ordering {
		match (self, other) {
			(
				Self::Integer {
					negative: a_neg,
					magnitude: a,
				},
				Self::Integer {
					negative: b_neg,
					magnitude: b,
				},
			) => match (a_neg, b_neg) {
				(false, false) => a.cmp(b),
				(true, true) => b.cmp(a),
				(true, false) => Ordering::Less,
				(false, true) => Ordering::Greater,
			},
			(Self::Fraction(a), Self::Fraction(b)) => a.cmp(b),
			_ => match (self.to_decimal(), other.to_decimal()) {
				(Some(a), Some(b)) => a.cmp(&b),
				// One side is an integer beyond the Decimal range, so its sign decides.
				(None, _) => {
					if self.is_negative() {
						Ordering::Less
					} else {
						Ordering::Greater
					}
				}
				(_, None) => {
					if other.is_negative() {
						Ordering::Greater
					} else {
						Ordering::Less
					}
				}
			},
		}
	}
}

impl PartialOrd for Numeric {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl PartialEq for Numeric {
	fn eq(&self, other: &Self) -> bool {
		self.cmp(other) == Ordering::Equal
	}
}

impl Eq for Numeric {}

impl fmt::Display for Numeric {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Integer {
				negative: true,
				magnitude,
			} => write!(f, "-{}", magnitude),
			Self::Integer { magnitude, .. } => write!(f, "{}", magnitude),
			Self::Fraction(decimal) => write!(f, "{}", decimal),
		}
	}
}

/// Parses a number from a JSON number or numeric string.
///
/// Scientific notation (`1e18`) is accepted; anything else that is not a
/// plain decimal returns `None`. Hex strings are not numbers here.
pub fn parse_number(value: &Value) -> Option<Numeric> {
	match value {
		Value::Number(n) => number_from_str(&n.to_string()),
		Value::String(s) => number_from_str(s),
		_ => None,
	}
}

pub fn number_from_str(raw: &str) -> Option<Numeric> {
	let raw = raw.trim();
	if raw.is_empty() {
		return None;
	}
	let (negative, unsigned) = match raw.as_bytes()[0] {
		b'-' => (true, &raw[1..]),
		b'+' => (false, &raw[1..]),
		_ => (false, raw),
	};
	if let Some(magnitude) = integer_digits(unsigned) {
		return Some(Numeric::integer(negative, magnitude));
	}
	if let Some(magnitude) = scientific_integer(unsigned) {
		return Some(Numeric::integer(negative, magnitude));
	}
	Decimal::from_str(raw)
		.or_else(|_| Decimal::from_scientific(raw))
		.ok()
		.map(Numeric::Fraction)
}

fn integer_digits(digits: &str) -> Option<U256> {
	if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
		return None;
	}
	U256::from_str_radix(digits, 10).ok()
}

/// `1.5e30` style values whose exponent leaves no fractional digits.
fn scientific_integer(raw: &str) -> Option<U256> {
	let (mantissa, exponent) = raw.split_once(['e', 'E'])?;
	let exponent: usize = exponent.strip_prefix('+').unwrap_or(exponent).parse().ok()?;
	let (whole, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
	if whole.is_empty() && fraction.is_empty() {
		return None;
	}
	if exponent < fraction.len() || exponent > MAX_U256_DIGITS {
		return None;
	}
	let mut digits = format!("{}{}", whole, fraction);
	digits.extend(std::iter::repeat('0').take(exponent - fraction.len()));
	integer_digits(&digits)
}

/// Parses an RFC 3339 timestamp.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
	DateTime::parse_from_rfc3339(raw.trim())
		.ok()
		.map(|date| date.with_timezone(&Utc))
}

/// Renders a scalar JSON value as text for string comparisons.
pub fn value_as_text(value: &Value) -> Option<String> {
	match value {
		Value::String(s) => Some(s.clone()),
		Value::Number(n) => Some(n.to_string()),
		Value::Bool(b) => Some(b.to_string()),
		_ => None,
	}
}

/// Splits text into lower-cased tokens on `separator`, or on whitespace.
pub fn tokenize(text: &str, separator: Option<&str>) -> Vec<String> {
	match separator {
		Some(sep) if !sep.is_empty() => text
			.split(sep)
			.map(|token| token.trim().to_lowercase())
			.filter(|token| !token.is_empty())
			.collect(),
		_ => text
			.split_whitespace()
			.map(|token| token.to_lowercase())
			.collect(),
	}
}

/// Whether `needle` appears in `haystack` as a run of whole tokens.
pub fn contains_words(haystack: &str, needle: &str, separator: Option<&str>) -> bool {
	let needle_tokens = tokenize(needle, separator);
	if needle_tokens.is_empty() {
		return false;
	}
	let haystack_tokens = tokenize(haystack, separator);
	haystack_tokens
		.windows(needle_tokens.len())
		.any(|window| window == needle_tokens.as_slice())
}
