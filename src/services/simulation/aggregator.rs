//! Consolidation of per-transaction simulation outputs.

use serde_json::{json, Value};

use crate::{
	models::{
		InternalTransaction, MultiSimContractCallData, MultiSimOutput, SimDetails,
		SimulationTransactionOutput, Status,
	},
	services::simulation::error::SimulationError,
};

/// Contract call status of a leg that executed without error
pub const CALL_SUCCESS: &str = "success";
/// Contract call status of a leg that reported an error
pub const CALL_REVERTED: &str = "reverted";

/// Merges simulation outputs into a single multi-transaction result.
///
/// Per-leg fields are zipped in input order, so every per-leg vector of the
/// result has exactly `outputs.len()` entries. The first leg error becomes the
/// aggregate `error` and turns the aggregate status to `failed`; the other
/// legs are still reported. `system` and `network` come from the first leg.
///
/// # Errors
/// Returns [`SimulationError::EmptyBatch`] if `outputs` is empty.
pub fn aggregate(outputs: &[SimulationTransactionOutput]) -> Result<MultiSimOutput, SimulationError> {
	let first = outputs.first().ok_or_else(SimulationError::empty_batch)?;

	let error = outputs.iter().find_map(|output| output.error.clone());
	let status = if error.is_some() {
		Status::Failed
	} else {
		Status::Simulated
	};

	let sim_details = SimDetails {
		block_number: outputs
			.iter()
			.map(|output| output.sim_details.block_number)
			.max()
			.unwrap_or_default(),
		e2e_ms: outputs.iter().map(|output| output.sim_details.e2e_ms).sum(),
		performance_profile: first.sim_details.performance_profile.clone(),
	};

	let aggregate = MultiSimOutput {
		id: first.id.clone(),
		contract_call: outputs
			.iter()
			.map(|output| MultiSimContractCallData {
				value: output.contract_call.clone(),
				status: if output.error.is_some() {
					CALL_REVERTED
				} else {
					CALL_SUCCESS
				}
				.to_string(),
			})
			.collect(),
		error,
		gas_used: outputs.iter().map(|output| output.gas_used).collect(),
		internal_transactions: outputs
			.iter()
			.map(|output| output.internal_transactions.clone().unwrap_or_default())
			.collect(),
		net_balance_changes: outputs
			.iter()
			.map(|output| output.net_balance_changes.clone().unwrap_or_default())
			.collect(),
		network: first.network,
		sim_details,
		server_version: first.server_version.clone(),
		system: first.system,
		status,
		simulated_block_number: outputs
			.iter()
			.map(|output| output.simulated_block_number)
			.max()
			.unwrap_or_default(),
		transactions: outputs.iter().map(as_internal_transaction).collect(),
	};

	tracing::debug!(
		legs = outputs.len(),
		status = %aggregate.status,
		block = aggregate.simulated_block_number,
		"aggregated simulation outputs"
	);
	Ok(aggregate)
}

/// Describes a leg as the top-level call it executed.
fn as_internal_transaction(output: &SimulationTransactionOutput) -> InternalTransaction {
	InternalTransaction {
		kind: json!(output.kind),
		from: output.from.clone(),
		to: output.to.clone(),
		input: output.input.clone(),
		gas: output.gas,
		gas_price: output.gas_price.parse().ok(),
		gas_used: output.gas_used,
		value: json!(output.value),
		contract_call: output.contract_call.clone(),
		error: output.error.as_ref().map(|error| match error {
			Value::String(message) => message.clone(),
			other => other.to_string(),
		}),
		..Default::default()
	}
}
