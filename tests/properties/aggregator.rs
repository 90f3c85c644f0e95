use chain_event_engine::{
	models::Status,
	services::simulation::{aggregate, CALL_REVERTED, CALL_SUCCESS},
};
use proptest::{prelude::*, test_runner::Config};

use crate::properties::strategies::simulation_output_strategy;

proptest! {
	#![proptest_config(Config {
		failure_persistence: None,
		..Config::default()
	})]

	#[test]
	fn test_aggregate_preserves_legs(
		outputs in prop::collection::vec(simulation_output_strategy(), 1..8),
	) {
		let result = aggregate(&outputs).unwrap();

		prop_assert_eq!(
			&result.gas_used,
			&outputs.iter().map(|o| o.gas_used).collect::<Vec<_>>()
		);
		prop_assert_eq!(result.contract_call.len(), outputs.len());
		prop_assert_eq!(result.internal_transactions.len(), outputs.len());
		prop_assert_eq!(result.net_balance_changes.len(), outputs.len());
		prop_assert_eq!(result.transactions.len(), outputs.len());

		for (call, output) in result.contract_call.iter().zip(&outputs) {
			prop_assert_eq!(&call.value.method_name, &output.contract_call.method_name);
			let expected = if output.error.is_some() { CALL_REVERTED } else { CALL_SUCCESS };
			prop_assert_eq!(call.status.as_str(), expected);
		}

		let first_error = outputs.iter().find_map(|o| o.error.clone());
		prop_assert_eq!(result.status == Status::Failed, first_error.is_some());
		prop_assert_eq!(result.error, first_error);
		prop_assert_eq!(
			result.simulated_block_number,
			outputs.iter().map(|o| o.simulated_block_number).max().unwrap()
		);
		prop_assert_eq!(
			result.sim_details.e2e_ms,
			outputs.iter().map(|o| o.sim_details.e2e_ms).sum::<u64>()
		);
	}
}
