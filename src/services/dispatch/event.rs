//! Classification of raw server events.

use serde_json::Value;

use crate::{
	models::{Blockchain, ChainId, ServerEvent, Status, TransactionData, TransactionEventCode},
	services::{
		dispatch::error::DispatchError, filter::helpers::normalize_address, status::StatusUpdate,
	},
};

/// A server event ready to be routed
#[derive(Debug, Clone)]
pub struct InboundEvent {
	pub blockchain: Blockchain,
	pub event_code: TransactionEventCode,
	pub transaction: TransactionData,
	/// Raw transaction record, as account filters see it
	pub raw: Value,
	pub reorg: bool,
}

impl InboundEvent {
	/// Parses the transaction record carried by `raw`.
	///
	/// When the record names its own `system` and `network` those win over
	/// `blockchain`.
	pub fn new(
		blockchain: Blockchain,
		event_code: TransactionEventCode,
		raw: Value,
	) -> Result<Self, DispatchError> {
		let transaction: TransactionData = serde_json::from_value(raw.clone())
			.map_err(|e| DispatchError::invalid_event(format!("unreadable transaction: {}", e)))?;

		let blockchain = if raw.get("system").is_some() && raw.get("network").is_some() {
			let common = transaction.common();
			Blockchain::new(common.system, common.network)
		} else {
			blockchain
		};

		Ok(Self {
			blockchain,
			event_code,
			transaction,
			raw,
			reorg: false,
		})
	}

	/// Classifies a server event, using `fallback` when neither the event nor
	/// its transaction names a chain.
	pub fn from_server_event(event: ServerEvent, fallback: Blockchain) -> Result<Self, DispatchError> {
		let raw = event
			.transaction
			.ok_or_else(|| DispatchError::invalid_event("event has no transaction"))?;
		let inbound = Self::new(event.blockchain.unwrap_or(fallback), event.event_code, raw)?;
		Ok(inbound.with_reorg(event.reorg))
	}

	pub fn with_reorg(mut self, reorg: bool) -> Self {
		self.reorg = reorg;
		self
	}

	pub fn chain_id(&self) -> ChainId {
		self.blockchain.chain_id()
	}

	pub fn hash(&self) -> &str {
		self.transaction.hash()
	}

	pub fn status(&self) -> Status {
		self.transaction.status()
	}

	/// Addresses whose account subscriptions may care about the event, normalised and deduplicated.
	pub fn candidate_addresses(&self) -> Vec<String> {
		let mut addresses: Vec<String> = Vec::new();
		let explicit = self.raw.get("address").and_then(Value::as_str);
		for address in explicit
			.map(str::to_string)
			.into_iter()
			.chain(self.transaction.candidate_addresses())
		{
			let address = normalize_address(&address);
			if !address.is_empty() && !addresses.contains(&address) {
				addresses.push(address);
			}
		}
		addresses
	}

	/// Status update implied by the event.
	///
	/// Speed-ups and cancels carry the replacement hash and nonce.
	pub fn status_update(&self) -> StatusUpdate {
		let status = self.status();
		let mut update = StatusUpdate::new(status, self.event_code.clone());
		if matches!(status, Status::Speedup | Status::Cancel) {
			update = update.with_replacement(self.hash(), self.transaction.nonce());
		}
		if self.reorg {
			update = update.as_reorg();
		}
		update
	}
}
