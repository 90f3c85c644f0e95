//! Status transition errors.

use log::error;
use std::{error::Error, fmt};

use crate::models::Status;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusError {
	/// The transition is not allowed from the current status
	InvalidTransition {
		id: String,
		from: Option<Status>,
		to: Status,
	},
}

impl StatusError {
	fn format_message(&self) -> String {
		match self {
			Self::InvalidTransition { id, from, to } => match from {
				Some(from) => format!("Invalid transition for {}: {} -> {}", id, from, to),
				None => format!("Invalid transition for {}: -> {}", id, to),
			},
		}
	}

	pub fn invalid_transition(id: impl Into<String>, from: Option<Status>, to: Status) -> Self {
		let error = Self::InvalidTransition {
			id: id.into(),
			from,
			to,
		};
		error!("{}", error.format_message());
		error
	}
}

impl fmt::Display for StatusError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.format_message())
	}
}

impl Error for StatusError {}
