//! Simulation request and result models.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{
	ContractCall, InternalTransaction, NetBalanceChange, Network, Status, System,
};

/// Transaction submitted for a dry-run
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationTransaction {
	pub from: String,
	pub to: String,
	pub value: f64,
	pub gas: u64,
	pub input: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub gas_price: Option<u64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub max_priority_fee_per_gas: Option<u64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub max_fee_per_gas: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimDetails {
	pub block_number: u64,
	pub e2e_ms: u64,
	#[serde(default)]
	pub performance_profile: Value,
}

/// Result of simulating a single transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationTransactionOutput {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub id: Option<String>,
	pub from: String,
	pub to: String,
	#[serde(default)]
	pub value: f64,
	#[serde(default)]
	pub gas: u64,
	#[serde(default)]
	pub gas_price: String,
	#[serde(default)]
	pub input: String,
	#[serde(rename = "type", default)]
	pub kind: u8,
	#[serde(default)]
	pub gas_used: u64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub internal_transactions: Option<Vec<InternalTransaction>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub net_balance_changes: Option<Vec<NetBalanceChange>>,
	#[serde(default)]
	pub server_version: String,
	#[serde(default)]
	pub simulated_block_number: u64,
	#[serde(default)]
	pub sim_details: SimDetails,
	pub status: Status,
	pub system: System,
	pub network: Network,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<Value>,
	#[serde(default)]
	pub contract_call: ContractCall,
}

impl SimulationTransactionOutput {
	/// Output standing in for a leg whose simulation could not be obtained.
	pub fn failed(
		system: System,
		network: Network,
		transaction: &SimulationTransaction,
		error: impl Into<String>,
	) -> Self {
		Self {
			id: None,
			from: transaction.from.clone(),
			to: transaction.to.clone(),
			value: transaction.value,
			gas: transaction.gas,
			gas_price: transaction
				.gas_price
				.map(|price| price.to_string())
				.unwrap_or_default(),
			input: transaction.input.clone(),
			kind: if transaction.max_fee_per_gas.is_some() {
				2
			} else {
				0
			},
			gas_used: 0,
			internal_transactions: None,
			net_balance_changes: None,
			server_version: String::new(),
			simulated_block_number: 0,
			sim_details: SimDetails::default(),
			status: Status::Failed,
			system,
			network,
			error: Some(Value::String(error.into())),
			contract_call: ContractCall::default(),
		}
	}
}

/// Contract call of one leg of a multi-simulation, tagged with its outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiSimContractCallData {
	pub value: ContractCall,
	pub status: String,
}

/// Consolidated result of simulating several transactions in order.
///
/// Every `Vec` indexed per leg has one entry per input transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiSimOutput {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub id: Option<String>,
	pub contract_call: Vec<MultiSimContractCallData>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<Value>,
	pub gas_used: Vec<u64>,
	pub internal_transactions: Vec<Vec<InternalTransaction>>,
	pub net_balance_changes: Vec<Vec<NetBalanceChange>>,
	pub network: Network,
	pub sim_details: SimDetails,
	pub server_version: String,
	pub system: System,
	pub status: Status,
	pub simulated_block_number: u64,
	pub transactions: Vec<InternalTransaction>,
}
