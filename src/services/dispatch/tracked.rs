//! Per-transaction state owned by a dispatch worker.

use std::time::Duration;
use tokio::time::Instant;

use crate::{
	models::{Blockchain, Status, TransactionData, TransactionEventCode},
	services::{
		registry::EmitterId,
		status::{StatusError, StatusMachine, StatusUpdate, Transition},
	},
};

#[derive(Debug)]
pub struct TrackedTransaction {
	machine: StatusMachine,
	blockchain: Blockchain,
	emitter: EmitterId,
	last: Option<TransactionData>,
	terminal_since: Option<Instant>,
}

impl TrackedTransaction {
	pub fn new(id: &str, hash: &str, blockchain: Blockchain, emitter: EmitterId) -> Self {
		Self {
			machine: StatusMachine::new(id, hash),
			blockchain,
			emitter,
			last: None,
			terminal_since: None,
		}
	}

	/// Applies an update and keeps the payload it came with.
	///
	/// A rejected update leaves the transaction as it was.
	pub fn apply(
		&mut self,
		update: StatusUpdate,
		payload: &TransactionData,
	) -> Result<Transition, StatusError> {
		let transition = self.machine.apply(update)?;
		self.last = Some(payload.clone());
		self.terminal_since = if self.machine.is_terminal() {
			self.terminal_since.or_else(|| Some(Instant::now()))
		} else {
			None
		};
		Ok(transition)
	}

	/// Whether the transaction has been terminal for at least `grace`.
	pub fn is_expired(&self, grace: Duration) -> bool {
		self.terminal_since
			.is_some_and(|since| since.elapsed() >= grace)
	}

	pub fn emitter(&self) -> EmitterId {
		self.emitter
	}

	pub fn snapshot(&self) -> TrackedSnapshot {
		TrackedSnapshot {
			id: self.machine.id().to_string(),
			hash: self.machine.hash().to_string(),
			nonce: self.machine.nonce(),
			status: self.machine.status(),
			history: self.machine.history().to_vec(),
			blockchain: self.blockchain,
			emitter: self.emitter,
			last: self.last.clone(),
		}
	}
}

/// Copy of a tracked transaction's state
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedSnapshot {
	pub id: String,
	/// Current on-chain hash; differs from `id` after a replacement
	pub hash: String,
	pub nonce: Option<u64>,
	pub status: Option<Status>,
	pub history: Vec<TransactionEventCode>,
	pub blockchain: Blockchain,
	pub emitter: EmitterId,
	/// Last accepted payload
	pub last: Option<TransactionData>,
}
