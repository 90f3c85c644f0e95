//! Transport error types.

use log::error;
use std::{error::Error, fmt};

#[derive(Debug, Clone, PartialEq)]
pub enum TransportError {
	/// The connection could not be established or was lost
	ConnectionError(String),
	/// An outbound message could not be written
	SendError(String),
	/// A request got no answer in time
	Timeout(String),
	/// The peer sent something that is not a valid message
	ProtocolError(String),
	/// The transport was closed by the caller
	Closed,
}

impl TransportError {
	fn format_message(&self) -> String {
		match self {
			Self::ConnectionError(msg) => format!("Connection error: {}", msg),
			Self::SendError(msg) => format!("Send error: {}", msg),
			Self::Timeout(msg) => format!("Timed out: {}", msg),
			Self::ProtocolError(msg) => format!("Protocol error: {}", msg),
			Self::Closed => "Transport closed".to_string(),
		}
	}

	pub fn connection_error(msg: impl Into<String>) -> Self {
		let error = Self::ConnectionError(msg.into());
		error!("{}", error.format_message());
		error
	}

	pub fn send_error(msg: impl Into<String>) -> Self {
		let error = Self::SendError(msg.into());
		error!("{}", error.format_message());
		error
	}

	pub fn timeout(msg: impl Into<String>) -> Self {
		let error = Self::Timeout(msg.into());
		error!("{}", error.format_message());
		error
	}

	pub fn protocol_error(msg: impl Into<String>) -> Self {
		let error = Self::ProtocolError(msg.into());
		error!("{}", error.format_message());
		error
	}
}

impl fmt::Display for TransportError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.format_message())
	}
}

impl Error for TransportError {}
