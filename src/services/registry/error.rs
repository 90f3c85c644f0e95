//! Registry error types.

use log::error;
use std::{error::Error, fmt};

use crate::services::filter::FilterError;

#[derive(Debug, Clone, PartialEq)]
pub enum RegistryError {
	/// The emitter is already registered for this address
	DuplicateAccount(String),
	/// The handle does not refer to a live registration
	UnknownHandle(String),
	/// A filter attached to the subscription could not be parsed
	InvalidFilter(FilterError),
}

impl RegistryError {
	fn format_message(&self) -> String {
		match self {
			Self::DuplicateAccount(msg) => format!("Duplicate account subscription: {}", msg),
			Self::UnknownHandle(msg) => format!("Unknown registration handle: {}", msg),
			Self::InvalidFilter(err) => format!("Invalid subscription filter: {}", err),
		}
	}

	pub fn duplicate_account(msg: impl Into<String>) -> Self {
		let error = Self::DuplicateAccount(msg.into());
		error!("{}", error.format_message());
		error
	}

	pub fn unknown_handle(msg: impl Into<String>) -> Self {
		let error = Self::UnknownHandle(msg.into());
		error!("{}", error.format_message());
		error
	}
}

impl fmt::Display for RegistryError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.format_message())
	}
}

impl Error for RegistryError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match self {
			Self::InvalidFilter(err) => Some(err),
			_ => None,
		}
	}
}

impl From<FilterError> for RegistryError {
	fn from(err: FilterError) -> Self {
		Self::InvalidFilter(err)
	}
}
