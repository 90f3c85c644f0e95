//! Event payloads exchanged with the event server.
//!
//! - [`EventObject`]: caller supplied events (e.g. a wallet reporting `txSent`)
//! - [`OutboundMessage`]: what the engine writes to the transport
//! - [`ServerMessage`]: what the transport hands back to the engine

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::models::{Blockchain, Config, SimulationTransaction, TransactionEventCode};

/// Fields carried by every event object
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseEventObject {
	pub event_code: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub event_id: Option<String>,
	pub category_code: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseTransactionEventObject {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub start_time: Option<u64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub status: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub id: Option<String>,
}

/// Transaction body of a [`TransactionEventObject`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TransactionEventBody {
	Bitcoin {
		#[serde(flatten)]
		base: BaseTransactionEventObject,
		txid: String,
	},
	Ethereum {
		#[serde(flatten)]
		base: BaseTransactionEventObject,
		hash: String,
	},
	Simulation(SimulationTransaction),
	SimulationBatch(Vec<SimulationTransaction>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionEventObject {
	#[serde(flatten)]
	pub base: BaseEventObject,
	pub transaction: TransactionEventBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Balance {
	pub balance: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletEventObject {
	#[serde(flatten)]
	pub base: BaseEventObject,
	pub balance: Balance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractInvocation {
	#[serde(rename = "methodName")]
	pub method_name: String,
	pub parameters: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractEventObject {
	#[serde(flatten)]
	pub base: BaseEventObject,
	pub contract: ContractInvocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountRef {
	pub address: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountEventObject {
	#[serde(flatten)]
	pub base: BaseEventObject,
	pub account: AccountRef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitializeEventObject {
	#[serde(flatten)]
	pub base: BaseEventObject,
	#[serde(rename = "connectionId")]
	pub connection_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigEventObject {
	#[serde(flatten)]
	pub base: BaseEventObject,
	pub config: Config,
}

/// Any event a caller can push through the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventObject {
	Transaction(TransactionEventObject),
	Wallet(WalletEventObject),
	Contract(ContractEventObject),
	Account(AccountEventObject),
	Initialize(InitializeEventObject),
	Config(ConfigEventObject),
}

impl EventObject {
	pub fn base(&self) -> &BaseEventObject {
		match self {
			EventObject::Transaction(e) => &e.base,
			EventObject::Wallet(e) => &e.base,
			EventObject::Contract(e) => &e.base,
			EventObject::Account(e) => &e.base,
			EventObject::Initialize(e) => &e.base,
			EventObject::Config(e) => &e.base,
		}
	}
}

/// Message written to the transport.
///
/// The engine stamps `blockchain`, `dappId` and `version` before sending;
/// everything specific to the request lives in `payload`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundMessage {
	pub category_code: String,
	pub event_code: String,
	#[serde(default)]
	pub time_stamp: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub dapp_id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub version: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub app_name: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub app_version: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub blockchain: Option<Blockchain>,
	#[serde(flatten)]
	pub payload: Map<String, Value>,
}

impl OutboundMessage {
	pub fn new(category_code: &str, event_code: &str) -> Self {
		Self {
			category_code: category_code.to_string(),
			event_code: event_code.to_string(),
			time_stamp: chrono::Utc::now().to_rfc3339(),
			dapp_id: None,
			version: None,
			app_name: None,
			app_version: None,
			blockchain: None,
			payload: Map::new(),
		}
	}

	pub fn with(mut self, key: &str, value: Value) -> Self {
		self.payload.insert(key.to_string(), value);
		self
	}

	pub fn initialize(connection_id: Option<&str>) -> Self {
		let message = Self::new("initialize", "checkDappId");
		match connection_id {
			Some(id) => message.with("connectionId", json!(id)),
			None => message,
		}
	}

	pub fn watch_transaction(hash: &str, id: &str) -> Self {
		Self::new("activeTransaction", "watch").with("transaction", json!({ "hash": hash, "id": id }))
	}

	pub fn unwatch_transaction(hash: &str) -> Self {
		Self::new("activeTransaction", "unwatch").with("transaction", json!({ "hash": hash }))
	}

	pub fn watch_account(address: &str) -> Self {
		Self::new("accountAddress", "watch").with("account", json!({ "address": address }))
	}

	pub fn unwatch_account(address: &str) -> Self {
		Self::new("accountAddress", "unwatch").with("account", json!({ "address": address }))
	}

	pub fn put_config(config: &Config) -> Self {
		Self::new("configs", "put").with("config", json!(config))
	}

	pub fn simulate(event_id: &str, transaction: &SimulationTransaction) -> Self {
		Self::new("simulate", "txSimulation")
			.with("eventId", json!(event_id))
			.with("transaction", json!(transaction))
	}

	/// Wraps a caller supplied event for sending.
	pub fn from_event(event: &EventObject) -> Self {
		let base = event.base();
		let mut message = Self::new(&base.category_code, &base.event_code);
		if let Ok(Value::Object(fields)) = serde_json::to_value(event) {
			for (key, value) in fields {
				if key != "categoryCode" && key != "eventCode" {
					message.payload.insert(key, value);
				}
			}
		}
		message
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
	#[default]
	Ok,
	Error,
}

/// Event section of a [`ServerMessage`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerEvent {
	pub event_code: TransactionEventCode,
	#[serde(default)]
	pub category_code: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub event_id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub blockchain: Option<Blockchain>,
	/// Raw transaction record, kept untyped so filters can address any field
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub transaction: Option<Value>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub account: Option<AccountRef>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub config: Option<Config>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub contract_call: Option<Value>,
	/// Set by the server when a confirmed transaction was re-orged out
	#[serde(default)]
	pub reorg: bool,
}

/// Message received from the event server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
	#[serde(default)]
	pub status: ServerStatus,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub reason: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub connection_id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub server_version: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub event: Option<ServerEvent>,
}
