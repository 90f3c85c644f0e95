//! Transaction payload models.
//!
//! These mirror the records the event server pushes for monitored
//! transactions. Deserialization is lenient: optional data missing from a
//! payload falls back to defaults so a partial server record still dispatches.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::models::{Network, Status, System};

/// Decoded contract call attached to a transaction
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractCall {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub contract_type: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub contract_address: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub contract_alias: Option<String>,
	#[serde(default)]
	pub method_name: String,
	#[serde(default)]
	pub params: serde_json::Map<String, Value>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub contract_name: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub contract_decimals: Option<u32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub decimal_value: Option<String>,
}

/// Internal (nested) call produced while executing a transaction
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalTransaction {
	/// Call type, either a name (`CALL`) or an opcode number
	#[serde(rename = "type", default)]
	pub kind: Value,
	#[serde(default)]
	pub from: String,
	#[serde(default)]
	pub to: String,
	#[serde(default)]
	pub input: String,
	#[serde(default)]
	pub gas: u64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub gas_price: Option<u64>,
	#[serde(default)]
	pub gas_used: u64,
	/// Either a decimal string or a number
	#[serde(default)]
	pub value: Value,
	#[serde(default)]
	pub contract_call: ContractCall,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error_reason: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub base_fee_per_gas_gwei: Option<f64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub max_fee_per_gas: Option<f64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub max_priority_fee_per_gas_gwei: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
	#[serde(rename = "type", default)]
	pub kind: String,
	#[serde(default)]
	pub symbol: String,
	#[serde(default)]
	pub contract_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BreakDown {
	pub counterparty: String,
	pub amount: String,
}

/// Balance delta for a single asset.
///
/// Ethereum payloads carry `asset` and `breakdown`, Bitcoin payloads carry the
/// affected `address` instead.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BalanceChange {
	pub delta: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub address: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub asset: Option<Asset>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub breakdown: Vec<BreakDown>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetBalanceChange {
	pub address: String,
	#[serde(default)]
	pub balance_changes: Vec<BalanceChange>,
}

/// Fields shared by every chain's transaction payload
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommonTransactionData {
	#[serde(default)]
	pub system: System,
	#[serde(default)]
	pub network: Network,
	pub status: Status,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub id: Option<String>,
	#[serde(default)]
	pub event_code: String,
	#[serde(default)]
	pub time_stamp: String,
	#[serde(default)]
	pub server_version: String,
	#[serde(default)]
	pub monitor_id: String,
	#[serde(default)]
	pub monitor_version: String,
	#[serde(default)]
	pub dispatch_timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InputOutput {
	pub address: String,
	pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScriptSig {
	pub asm: String,
	pub hex: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vin {
	pub txid: String,
	pub vout: u32,
	#[serde(default)]
	pub script_sig: ScriptSig,
	#[serde(default)]
	pub txinwitness: Vec<String>,
	pub sequence: u64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptPubKey {
	pub asm: String,
	pub hex: String,
	#[serde(default)]
	pub req_sigs: u32,
	#[serde(rename = "type")]
	pub kind: String,
	#[serde(default)]
	pub addresses: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vout {
	pub value: f64,
	pub n: u32,
	pub script_pub_key: ScriptPubKey,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BitcoinRawTransaction {
	pub txid: String,
	pub hash: String,
	pub version: u32,
	pub size: u64,
	pub vsize: u64,
	pub weight: u64,
	pub locktime: u64,
	#[serde(default)]
	pub vin: Vec<Vin>,
	#[serde(default)]
	pub vout: Vec<Vout>,
	pub hex: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BitcoinTransactionData {
	#[serde(flatten)]
	pub common: CommonTransactionData,
	pub txid: String,
	#[serde(default)]
	pub inputs: Vec<InputOutput>,
	#[serde(default)]
	pub outputs: Vec<InputOutput>,
	#[serde(default)]
	pub fee: String,
	#[serde(default)]
	pub net_balance_changes: Vec<BalanceChange>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub raw_transaction: Option<BitcoinRawTransaction>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EthereumTransactionData {
	#[serde(flatten)]
	pub common: CommonTransactionData,
	pub hash: String,
	#[serde(default)]
	pub asset: String,
	#[serde(default)]
	pub block_hash: Option<String>,
	#[serde(default)]
	pub block_number: Option<u64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub contract_call: Option<ContractCall>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub internal_transactions: Option<Vec<InternalTransaction>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub net_balance_changes: Option<Vec<NetBalanceChange>>,
	#[serde(default)]
	pub to: String,
	#[serde(default)]
	pub from: String,
	#[serde(default)]
	pub gas: u64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub gas_price: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub gas_used: Option<u64>,
	#[serde(default)]
	pub input: String,
	#[serde(default)]
	pub nonce: u64,
	#[serde(default)]
	pub v: String,
	#[serde(default)]
	pub r: String,
	#[serde(default)]
	pub s: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub transaction_index: Option<u64>,
	#[serde(default)]
	pub value: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub start_time: Option<u64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub time_pending: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub watched_address: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub replace_hash: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub counterparty: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub direction: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub base_fee_per_gas_gwei: Option<f64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub max_priority_fee_per_gas_gwei: Option<f64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub max_fee_per_gas_gwei: Option<f64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub gas_price_gwei: Option<f64>,
}

/// Chain-specific transaction payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TransactionData {
	Bitcoin(BitcoinTransactionData),
	Ethereum(EthereumTransactionData),
}

impl TransactionData {
	pub fn common(&self) -> &CommonTransactionData {
		match self {
			TransactionData::Bitcoin(tx) => &tx.common,
			TransactionData::Ethereum(tx) => &tx.common,
		}
	}

	/// Hash (Ethereum) or txid (Bitcoin)
	pub fn hash(&self) -> &str {
		match self {
			TransactionData::Bitcoin(tx) => &tx.txid,
			TransactionData::Ethereum(tx) => &tx.hash,
		}
	}

	pub fn status(&self) -> Status {
		self.common().status
	}

	/// Hash of the transaction this one replaces (speed-up / cancel)
	pub fn replace_hash(&self) -> Option<&str> {
		match self {
			TransactionData::Ethereum(tx) => tx.replace_hash.as_deref(),
			TransactionData::Bitcoin(_) => None,
		}
	}

	pub fn nonce(&self) -> Option<u64> {
		match self {
			TransactionData::Ethereum(tx) => Some(tx.nonce),
			TransactionData::Bitcoin(_) => None,
		}
	}

	/// Addresses an account subscription could be watching for this payload.
	///
	/// The server-provided `watchedAddress` comes first when present.
	pub fn candidate_addresses(&self) -> Vec<String> {
		let mut addresses = Vec::new();
		match self {
			TransactionData::Ethereum(tx) => {
				if let Some(watched) = &tx.watched_address {
					addresses.push(watched.clone());
				}
				addresses.push(tx.from.clone());
				addresses.push(tx.to.clone());
				if let Some(counterparty) = &tx.counterparty {
					addresses.push(counterparty.clone());
				}
			}
			TransactionData::Bitcoin(tx) => {
				addresses.extend(tx.inputs.iter().map(|io| io.address.clone()));
				addresses.extend(tx.outputs.iter().map(|io| io.address.clone()));
			}
		}
		addresses.retain(|address| !address.is_empty());
		addresses
	}
}

/// Lightweight transaction record returned when a caller starts watching a hash
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EthereumTransactionLog {
	pub id: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub start_time: Option<u64>,
	pub status: String,
	pub event_code: String,
	pub hash: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub from: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub to: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub value: Option<Value>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub gas: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub gas_price: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub max_priority_fee_per_gas: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub max_fee_per_gas: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub nonce: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BitcoinTransactionLog {
	pub id: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub start_time: Option<u64>,
	pub status: String,
	pub event_code: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub txid: Option<String>,
	#[serde(flatten)]
	pub extra: HashMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TransactionEventLog {
	Ethereum(EthereumTransactionLog),
	Bitcoin(BitcoinTransactionLog),
}

impl TransactionEventLog {
	pub fn id(&self) -> &str {
		match self {
			TransactionEventLog::Ethereum(log) => &log.id,
			TransactionEventLog::Bitcoin(log) => &log.id,
		}
	}
}

/// What listeners receive: a full server payload or a locally produced log
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EmitterPayload {
	Transaction(TransactionData),
	Log(TransactionEventLog),
}

impl EmitterPayload {
	pub fn as_transaction(&self) -> Option<&TransactionData> {
		match self {
			EmitterPayload::Transaction(tx) => Some(tx),
			EmitterPayload::Log(_) => None,
		}
	}
}
