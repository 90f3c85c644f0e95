//! Status state machine for a single monitored transaction.
//!
//! The machine starts without a status when a caller begins watching a hash
//! and accepts whatever the server reports first. From then on only the
//! transitions below are legal:
//!
//! | from                     | to                                                    |
//! |--------------------------|-------------------------------------------------------|
//! | `pending-simulation`     | `pending`, `simulated`                                |
//! | `pending`                | `confirmed`, `speedup`, `cancel`, `stuck`, `failed`, `dropped` |
//! | `speedup`/`cancel`/`stuck` | `speedup`, `cancel`, `stuck`, `confirmed`, `failed`, `dropped` |
//! | `confirmed` (reorg, once) | `pending`                                            |
//!
//! Re-delivering the current non-terminal status is accepted and changes
//! nothing. A rejected transition leaves the machine untouched.

use crate::{
	models::{Status, TransactionEventCode},
	services::status::error::StatusError,
};

/// New identity carried by a speed-up or cancel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
	pub hash: String,
	pub nonce: Option<u64>,
}

/// A status report for the transaction
#[derive(Debug, Clone)]
pub struct StatusUpdate {
	pub status: Status,
	pub event_code: TransactionEventCode,
	pub replacement: Option<Replacement>,
	pub reorg: bool,
}

impl StatusUpdate {
	pub fn new(status: Status, event_code: TransactionEventCode) -> Self {
		Self {
			status,
			event_code,
			replacement: None,
			reorg: false,
		}
	}

	pub fn with_replacement(mut self, hash: impl Into<String>, nonce: Option<u64>) -> Self {
		self.replacement = Some(Replacement {
			hash: hash.into(),
			nonce,
		});
		self
	}

	pub fn as_reorg(mut self) -> Self {
		self.reorg = true;
		self
	}
}

/// Outcome of an accepted update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
	/// First status reported for the transaction
	Initial(Status),
	Advanced { from: Status, to: Status },
	/// Same non-terminal status delivered again
	Unchanged(Status),
	/// Confirmation rolled back by a chain reorganisation
	Reorged,
}

#[derive(Debug, Clone)]
pub struct StatusMachine {
	/// Logical id, stable across replacements
	id: String,
	hash: String,
	nonce: Option<u64>,
	status: Option<Status>,
	reorged: bool,
	history: Vec<TransactionEventCode>,
}

impl StatusMachine {
	pub fn new(id: impl Into<String>, hash: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			hash: hash.into(),
			nonce: None,
			status: None,
			reorged: false,
			history: Vec::new(),
		}
	}

	pub fn id(&self) -> &str {
		&self.id
	}

	/// Hash currently identifying the transaction on chain
	pub fn hash(&self) -> &str {
		&self.hash
	}

	pub fn nonce(&self) -> Option<u64> {
		self.nonce
	}

	pub fn status(&self) -> Option<Status> {
		self.status
	}

	/// Event codes of every accepted update, oldest first
	pub fn history(&self) -> &[TransactionEventCode] {
		&self.history
	}

	pub fn is_terminal(&self) -> bool {
		self.status.is_some_and(|status| status.is_terminal())
	}

	/// Applies a status update.
	///
	/// # Errors
	/// Returns [`StatusError::InvalidTransition`] if the update is not legal
	/// from the current status. The machine is left unchanged.
	pub fn apply(&mut self, update: StatusUpdate) -> Result<Transition, StatusError> {
		let transition = self.check(&update)?;

		if let Some(replacement) = update.replacement {
			if matches!(update.status, Status::Speedup | Status::Cancel) {
				tracing::debug!(
					id = %self.id,
					old_hash = %self.hash,
					new_hash = %replacement.hash,
					"transaction replaced"
				);
				self.hash = replacement.hash;
				if replacement.nonce.is_some() {
					self.nonce = replacement.nonce;
				}
			}
		}
		if transition == Transition::Reorged {
			self.reorged = true;
		}
		self.status = Some(update.status);
		self.history.push(update.event_code);

		Ok(transition)
	}

	fn check(&self, update: &StatusUpdate) -> Result<Transition, StatusError> {
		let Some(current) = self.status else {
			return Ok(Transition::Initial(update.status));
		};
		let next = update.status;

		if current == next && !current.is_terminal() {
			return Ok(Transition::Unchanged(current));
		}
		if current == Status::Confirmed && next == Status::Pending {
			if update.reorg && !self.reorged {
				return Ok(Transition::Reorged);
			}
			return Err(StatusError::invalid_transition(&self.id, Some(current), next));
		}
		if is_legal(current, next) {
			return Ok(Transition::Advanced {
				from: current,
				to: next,
			});
		}
		Err(StatusError::invalid_transition(&self.id, Some(current), next))
	}
}

fn is_legal(from: Status, to: Status) -> bool {
	use Status::*;
	match from {
		PendingSimulation => matches!(to, Pending | Simulated),
		Pending => matches!(to, Confirmed | Speedup | Cancel | Stuck | Failed | Dropped),
		Speedup | Cancel | Stuck => matches!(
			to,
			Speedup | Cancel | Stuck | Confirmed | Failed | Dropped
		),
		Confirmed | Failed | Dropped | Simulated => false,
	}
}
