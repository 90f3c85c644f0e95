use async_trait::async_trait;
use futures::future::join_all;

use crate::{
	models::{MultiSimOutput, Network, SimulationTransaction, SimulationTransactionOutput, System},
	services::simulation::{aggregator::aggregate, error::SimulationError},
};

/// Simulates a single transaction against a chain
#[async_trait]
pub trait Simulator: Send + Sync {
	async fn simulate(
		&self,
		system: System,
		network: Network,
		transaction: SimulationTransaction,
	) -> Result<SimulationTransactionOutput, SimulationError>;
}

/// Simulates every transaction concurrently and aggregates the outputs in input order.
///
/// A leg whose simulation fails is reported through a failed output instead of
/// aborting the batch.
pub async fn simulate_all<S>(
	simulator: &S,
	system: System,
	network: Network,
	transactions: &[SimulationTransaction],
) -> Result<MultiSimOutput, SimulationError>
where
	S: Simulator + ?Sized,
{
	if transactions.is_empty() {
		return Err(SimulationError::empty_batch());
	}

	let outputs = join_all(
		transactions
			.iter()
			.map(|transaction| simulator.simulate(system, network, transaction.clone())),
	)
	.await;

	let outputs: Vec<SimulationTransactionOutput> = outputs
		.into_iter()
		.zip(transactions)
		.enumerate()
		.map(|(leg, (output, transaction))| {
			output.unwrap_or_else(|err| {
				tracing::warn!(leg, error = %err, "simulation leg failed");
				SimulationTransactionOutput::failed(system, network, transaction, err.to_string())
			})
		})
		.collect();

	aggregate(&outputs)
}
