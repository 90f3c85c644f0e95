//! Error shape reported to callers through hooks and `Result`s.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Error surfaced to the caller layer.
///
/// Every failure inside the engine is reported in this shape instead of
/// aborting; `account` / `transaction` identify the subscription involved.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SdkError {
	pub message: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<Value>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub account: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub transaction: Option<String>,
}

impl SdkError {
	pub fn new(message: impl Into<String>) -> Self {
		Self {
			message: message.into(),
			..Default::default()
		}
	}

	pub fn with_error(mut self, error: impl fmt::Display) -> Self {
		self.error = Some(Value::String(error.to_string()));
		self
	}

	pub fn for_account(mut self, address: impl Into<String>) -> Self {
		self.account = Some(address.into());
		self
	}

	pub fn for_transaction(mut self, hash: impl Into<String>) -> Self {
		self.transaction = Some(hash.into());
		self
	}
}

impl fmt::Display for SdkError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.error {
			Some(Value::String(cause)) => write!(f, "{}: {}", self.message, cause),
			Some(cause) => write!(f, "{}: {}", self.message, cause),
			None => write!(f, "{}", self.message),
		}
	}
}

impl std::error::Error for SdkError {}
