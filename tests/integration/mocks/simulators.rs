use async_trait::async_trait;
use mockall::mock;

use chain_event_engine::{
	models::{Network, SimulationTransaction, SimulationTransactionOutput, System},
	services::simulation::{SimulationError, Simulator},
};

// Mock implementation of a simulation backend.
// Lets tests decide per transaction whether a leg succeeds or fails.
mock! {
	pub SimulationBackend {}

	#[async_trait]
	impl Simulator for SimulationBackend {
		async fn simulate(
			&self,
			system: System,
			network: Network,
			transaction: SimulationTransaction,
		) -> Result<SimulationTransactionOutput, SimulationError>;
	}
}
