//! Simulation through the event server.

use async_trait::async_trait;
use std::{sync::Arc, time::Duration};

use crate::{
	models::{
		Blockchain, Network, OutboundMessage, ServerStatus, SimulationTransaction,
		SimulationTransactionOutput, System,
	},
	sdk::{
		requests::{PendingRequests, RequestFailure},
		stamp::MessageStamp,
	},
	services::{
		simulation::{SimulationError, Simulator},
		transport::Transport,
	},
};

/// [`Simulator`] that asks the event server and waits for the matching response
pub struct TransportSimulator {
	transport: Arc<dyn Transport>,
	pending: Arc<PendingRequests>,
	stamp: MessageStamp,
	timeout: Duration,
}

impl TransportSimulator {
	pub fn new(
		transport: Arc<dyn Transport>,
		pending: Arc<PendingRequests>,
		stamp: MessageStamp,
		timeout: Duration,
	) -> Self {
		Self {
			transport,
			pending,
			stamp,
			timeout,
		}
	}
}

#[async_trait]
impl Simulator for TransportSimulator {
	async fn simulate(
		&self,
		system: System,
		network: Network,
		transaction: SimulationTransaction,
	) -> Result<SimulationTransactionOutput, SimulationError> {
		let event_id = uuid::Uuid::new_v4().to_string();
		let key = PendingRequests::simulation_key(&event_id);
		let (ticket, receiver) = self.pending.register(key);

		let mut message = OutboundMessage::simulate(&event_id, &transaction);
		message.blockchain = Some(Blockchain::new(system, network));
		if let Err(e) = self.transport.send(self.stamp.apply(message)).await {
			self.pending.cancel(&ticket);
			return Err(SimulationError::request_failed(e.to_string()));
		}

		let response = self
			.pending
			.wait(&ticket, receiver, self.timeout)
			.await
			.map_err(|failure| match failure {
				RequestFailure::TimedOut => SimulationError::request_failed(format!(
					"no response after {}ms",
					self.timeout.as_millis()
				)),
				RequestFailure::Abandoned => SimulationError::request_failed("engine destroyed"),
			})?;

		if response.status == ServerStatus::Error {
			return Err(SimulationError::request_failed(
				response.reason.unwrap_or_else(|| "server error".to_string()),
			));
		}
		let output = response
			.event
			.and_then(|event| event.transaction)
			.ok_or_else(|| SimulationError::invalid_response("response carries no transaction"))?;
		serde_json::from_value(output).map_err(|e| SimulationError::invalid_response(e.to_string()))
	}
}
