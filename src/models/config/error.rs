//! Errors raised while building an [`EngineConfig`](super::EngineConfig).
//!
//! Settings come from a JSON file, from `ENGINE_*` environment overrides
//! and from the checks run before the engine connects; each source has its
//! own variant so callers can tell a typo in the file from a bad override.

use log::error;
use std::{error::Error, fmt};

#[derive(Debug)]
#[allow(clippy::enum_variant_names)]
pub enum ConfigError {
	/// A loaded setting is out of range or inconsistent with another one
	ValidationError(String),

	/// The configuration file is not valid engine JSON
	ParseError(String),

	/// The configuration file or directory could not be read
	FileError(String),

	/// An `ENGINE_*` variable holds a value of the wrong type
	EnvError(String),
}

impl ConfigError {
	fn format_message(&self) -> String {
		match self {
			Self::ValidationError(msg) => format!("Validation error: {}", msg),
			Self::ParseError(msg) => format!("Parse error: {}", msg),
			Self::FileError(msg) => format!("File error: {}", msg),
			Self::EnvError(msg) => format!("Environment error: {}", msg),
		}
	}

	fn logged(self) -> Self {
		error!("{}", self.format_message());
		self
	}

	pub fn validation_error(msg: impl Into<String>) -> Self {
		Self::ValidationError(msg.into()).logged()
	}

	pub fn parse_error(msg: impl Into<String>) -> Self {
		Self::ParseError(msg.into()).logged()
	}

	/// Unreadable path; `msg` names the file or directory involved
	pub fn file_error(msg: impl Into<String>) -> Self {
		Self::FileError(msg.into()).logged()
	}

	/// Override that failed to parse; `msg` names the variable
	pub fn env_error(msg: impl Into<String>) -> Self {
		Self::EnvError(msg.into()).logged()
	}
}

impl fmt::Display for ConfigError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.format_message())
	}
}

impl Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
	fn from(err: std::io::Error) -> Self {
		Self::file_error(err.to_string())
	}
}

impl From<serde_json::Error> for ConfigError {
	fn from(err: serde_json::Error) -> Self {
		Self::parse_error(err.to_string())
	}
}
