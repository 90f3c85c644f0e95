//! Simulation error types.

use log::error;
use std::{error::Error, fmt};

#[derive(Debug, Clone, PartialEq)]
pub enum SimulationError {
	/// No simulation outputs were supplied
	EmptyBatch,
	/// The simulation request could not be completed
	RequestFailed(String),
	/// The simulator answered with something that is not a simulation output
	InvalidResponse(String),
}

impl SimulationError {
	fn format_message(&self) -> String {
		match self {
			Self::EmptyBatch => "Cannot aggregate an empty simulation batch".to_string(),
			Self::RequestFailed(msg) => format!("Simulation request failed: {}", msg),
			Self::InvalidResponse(msg) => format!("Invalid simulation response: {}", msg),
		}
	}

	pub fn empty_batch() -> Self {
		let error = Self::EmptyBatch;
		error!("{}", error.format_message());
		error
	}

	pub fn request_failed(msg: impl Into<String>) -> Self {
		let error = Self::RequestFailed(msg.into());
		error!("{}", error.format_message());
		error
	}

	pub fn invalid_response(msg: impl Into<String>) -> Self {
		let error = Self::InvalidResponse(msg.into());
		error!("{}", error.format_message());
		error
	}
}

impl fmt::Display for SimulationError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.format_message())
	}
}

impl Error for SimulationError {}
