//! Test helper utilities for server transaction payloads
//!
//! - `TransactionBuilder`: Builder for raw transaction records and the server
//!   messages carrying them

use serde_json::{json, Map, Value};

use crate::models::{ServerEvent, ServerMessage, ServerStatus, Status, TransactionEventCode};

/// Builder for raw Ethereum transaction records as the event server sends them
pub struct TransactionBuilder {
	fields: Map<String, Value>,
}

impl Default for TransactionBuilder {
	fn default() -> Self {
		let mut fields = Map::new();
		fields.insert(
			"hash".to_string(),
			json!(format!("0x{}", "a".repeat(64))),
		);
		fields.insert("status".to_string(), json!("pending"));
		fields.insert("system".to_string(), json!("ethereum"));
		fields.insert("network".to_string(), json!("main"));
		fields.insert(
			"from".to_string(),
			json!("0x1111111111111111111111111111111111111111"),
		);
		fields.insert(
			"to".to_string(),
			json!("0x2222222222222222222222222222222222222222"),
		);
		fields.insert("value".to_string(), json!("0"));
		fields.insert("nonce".to_string(), json!(0));
		Self { fields }
	}
}

impl TransactionBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn hash(mut self, hash: &str) -> Self {
		self.fields.insert("hash".to_string(), json!(hash));
		self
	}

	pub fn status(mut self, status: Status) -> Self {
		self.fields
			.insert("status".to_string(), json!(status.to_string()));
		self
	}

	pub fn from(mut self, address: &str) -> Self {
		self.fields.insert("from".to_string(), json!(address));
		self
	}

	pub fn to(mut self, address: &str) -> Self {
		self.fields.insert("to".to_string(), json!(address));
		self
	}

	pub fn value(mut self, value: &str) -> Self {
		self.fields.insert("value".to_string(), json!(value));
		self
	}

	pub fn nonce(mut self, nonce: u64) -> Self {
		self.fields.insert("nonce".to_string(), json!(nonce));
		self
	}

	pub fn replace_hash(mut self, hash: &str) -> Self {
		self.fields.insert("replaceHash".to_string(), json!(hash));
		self
	}

	pub fn watched_address(mut self, address: &str) -> Self {
		self.fields
			.insert("watchedAddress".to_string(), json!(address));
		self
	}

	/// Sets an arbitrary field, e.g. a nested `contractCall`.
	pub fn field(mut self, key: &str, value: Value) -> Self {
		self.fields.insert(key.to_string(), value);
		self
	}

	pub fn build(self) -> Value {
		Value::Object(self.fields)
	}

	/// Wraps the record in a successful server message for `event_code`.
	pub fn into_message(self, event_code: TransactionEventCode) -> ServerMessage {
		ServerMessage {
			status: ServerStatus::Ok,
			event: Some(ServerEvent {
				event_code,
				category_code: "activeTransaction".to_string(),
				event_id: None,
				blockchain: None,
				transaction: Some(self.build()),
				account: None,
				config: None,
				contract_call: None,
				reorg: false,
			}),
			..ServerMessage::default()
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::models::TransactionData;

	#[test]
	fn test_built_record_parses_as_ethereum() {
		let raw = TransactionBuilder::new()
			.status(Status::Confirmed)
			.nonce(7)
			.build();
		let tx: TransactionData = serde_json::from_value(raw).unwrap();
		assert!(matches!(tx, TransactionData::Ethereum(_)));
		assert_eq!(tx.status(), Status::Confirmed);
		assert_eq!(tx.nonce(), Some(7));
	}

	#[test]
	fn test_into_message_carries_event_code() {
		let message = TransactionBuilder::new().into_message(TransactionEventCode::TxPool);
		let event = message.event.unwrap();
		assert_eq!(event.event_code, TransactionEventCode::TxPool);
		assert!(event.transaction.is_some());
	}
}
