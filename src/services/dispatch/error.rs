//! Dispatch error types.

use log::error;
use std::{error::Error, fmt, time::Duration};
use thiserror::Error as ThisError;

use crate::services::registry::EmitterId;

/// A listener that did not return normally.
///
/// Failures are collected in the dispatch report; the remaining listeners
/// still run.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum ListenerFailure {
	#[error("Listener {index} of emitter {emitter} panicked: {message}")]
	Panicked {
		emitter: EmitterId,
		index: usize,
		message: String,
	},

	#[error("Listener {index} of emitter {emitter} timed out after {timeout:?}")]
	TimedOut {
		emitter: EmitterId,
		index: usize,
		timeout: Duration,
	},
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
	/// The dispatcher was shut down before the event was processed
	ShutDown(String),
	/// The worker owning the event's key dropped it without answering
	WorkerUnavailable(String),
	/// The server event carried no usable transaction record
	InvalidEvent(String),
}

impl DispatchError {
	fn format_message(&self) -> String {
		match self {
			Self::ShutDown(msg) => format!("Dispatcher shut down: {}", msg),
			Self::WorkerUnavailable(msg) => format!("Dispatch worker unavailable: {}", msg),
			Self::InvalidEvent(msg) => format!("Invalid event: {}", msg),
		}
	}

	pub fn shut_down(msg: impl Into<String>) -> Self {
		let error = Self::ShutDown(msg.into());
		error!("{}", error.format_message());
		error
	}

	pub fn worker_unavailable(msg: impl Into<String>) -> Self {
		let error = Self::WorkerUnavailable(msg.into());
		error!("{}", error.format_message());
		error
	}

	pub fn invalid_event(msg: impl Into<String>) -> Self {
		let error = Self::InvalidEvent(msg.into());
		error!("{}", error.format_message());
		error
	}
}

impl fmt::Display for DispatchError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.format_message())
	}
}

impl Error for DispatchError {}
