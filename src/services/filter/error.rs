//! Filter error types.
//!
//! Filters are validated once, when the subscription that carries them is
//! registered. Evaluation itself never fails: a constraint that cannot be
//! checked against an event is a non-match.

use log::error;
use std::{error::Error, fmt};

#[derive(Debug, Clone, PartialEq)]
pub enum FilterError {
	/// The filter document does not have the expected shape
	InvalidFilter(String),
	/// A `_regexp` pattern failed to compile
	InvalidPattern(String),
	/// A range bound is neither a number nor a date
	InvalidRange(String),
}

impl FilterError {
	fn format_message(&self) -> String {
		match self {
			Self::InvalidFilter(msg) => format!("Invalid filter: {}", msg),
			Self::InvalidPattern(msg) => format!("Invalid pattern: {}", msg),
			Self::InvalidRange(msg) => format!("Invalid range: {}", msg),
		}
	}

	pub fn invalid_filter(msg: impl Into<String>) -> Self {
		let error = Self::InvalidFilter(msg.into());
		error!("{}", error.format_message());
		error
	}

	pub fn invalid_pattern(msg: impl Into<String>) -> Self {
		let error = Self::InvalidPattern(msg.into());
		error!("{}", error.format_message());
		error
	}

	pub fn invalid_range(msg: impl Into<String>) -> Self {
		let error = Self::InvalidRange(msg.into());
		error!("{}", error.format_message());
		error
	}
}

impl fmt::Display for FilterError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.format_message())
	}
}

impl Error for FilterError {}

impl From<regex::Error> for FilterError {
	fn from(err: regex::Error) -> Self {
		Self::invalid_pattern(err.to_string())
	}
}
