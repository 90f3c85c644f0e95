//! Integration tests for multi-transaction simulation.

use chain_event_engine::{
	models::{
		ContractCall, Network, SimDetails, SimulationTransaction, SimulationTransactionOutput,
		Status, System,
	},
	services::simulation::{simulate_all, SimulationError, CALL_REVERTED, CALL_SUCCESS},
};
use mockall::predicate;
use serde_json::{json, Value};

use crate::integration::mocks::MockSimulationBackend;

fn transaction(input: &str, gas: u64) -> SimulationTransaction {
	SimulationTransaction {
		from: "0x1111111111111111111111111111111111111111".to_string(),
		to: "0x2222222222222222222222222222222222222222".to_string(),
		value: 0.0,
		gas,
		input: input.to_string(),
		..SimulationTransaction::default()
	}
}

fn output(transaction: &SimulationTransaction, block: u64) -> SimulationTransactionOutput {
	SimulationTransactionOutput {
		id: Some(format!("sim-{}", transaction.input)),
		from: transaction.from.clone(),
		to: transaction.to.clone(),
		value: transaction.value,
		gas: transaction.gas,
		gas_price: "0".to_string(),
		input: transaction.input.clone(),
		kind: 2,
		gas_used: transaction.gas / 2,
		internal_transactions: None,
		net_balance_changes: None,
		server_version: "1.0.0".to_string(),
		simulated_block_number: block,
		sim_details: SimDetails {
			block_number: block,
			e2e_ms: 10,
			performance_profile: Value::Null,
		},
		status: Status::Simulated,
		system: System::Ethereum,
		network: Network::Main,
		error: None,
		contract_call: ContractCall {
			method_name: transaction.input.clone(),
			..ContractCall::default()
		},
	}
}

#[tokio::test]
async fn test_legs_keep_input_order_and_first_error_wins() {
	let transactions = vec![
		transaction("0xaa", 40_000),
		transaction("0xbb", 60_000),
		transaction("0xcc", 80_000),
	];

	let mut simulator = MockSimulationBackend::new();
	simulator
		.expect_simulate()
		.with(
			predicate::eq(System::Ethereum),
			predicate::eq(Network::Main),
			predicate::function(|tx: &SimulationTransaction| tx.input == "0xbb"),
		)
		.times(1)
		.returning(|_, _, tx| Err(SimulationError::request_failed(format!("{} reverted", tx.input))));
	simulator
		.expect_simulate()
		.withf(|_, _, tx| tx.input != "0xbb")
		.times(2)
		.returning(|_, _, tx| {
			let block = if tx.input == "0xaa" { 100 } else { 105 };
			Ok(output(&tx, block))
		});

	let result = simulate_all(&simulator, System::Ethereum, Network::Main, &transactions)
		.await
		.unwrap();

	assert_eq!(result.status, Status::Failed);
	assert_eq!(result.gas_used, vec![20_000, 0, 40_000]);
	assert_eq!(result.simulated_block_number, 105);
	assert_eq!(
		result
			.contract_call
			.iter()
			.map(|call| call.status.as_str())
			.collect::<Vec<_>>(),
		vec![CALL_SUCCESS, CALL_REVERTED, CALL_SUCCESS]
	);
	let error = result.error.unwrap().to_string();
	assert!(error.contains("0xbb reverted"), "{}", error);
	assert_eq!(result.transactions.len(), 3);
	assert_eq!(result.transactions[1].input, "0xbb");
}

#[tokio::test]
async fn test_all_legs_succeeding_yields_simulated() {
	let transactions = vec![transaction("0x01", 21_000), transaction("0x02", 21_000)];
	let mut simulator = MockSimulationBackend::new();
	simulator
		.expect_simulate()
		.times(2)
		.returning(|_, _, tx| Ok(output(&tx, 7)));

	let result = simulate_all(&simulator, System::Ethereum, Network::Main, &transactions)
		.await
		.unwrap();

	assert_eq!(result.status, Status::Simulated);
	assert!(result.error.is_none());
	assert_eq!(result.sim_details.e2e_ms, 20);
	assert_eq!(result.id.as_deref(), Some("sim-0x01"));
	assert_eq!(serde_json::to_value(&result).unwrap()["system"], json!("ethereum"));
}

#[tokio::test]
async fn test_empty_batch_is_rejected_without_calls() {
	let mut simulator = MockSimulationBackend::new();
	simulator.expect_simulate().never();

	let result = simulate_all(&simulator, System::Ethereum, Network::Main, &[]).await;
	assert!(matches!(result, Err(SimulationError::EmptyBatch)));
}
