use async_trait::async_trait;
use mockall::mock;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::{
	atomic::{AtomicBool, Ordering},
	Arc,
};
use tokio::sync::{mpsc, watch};

use chain_event_engine::{
	models::OutboundMessage,
	services::transport::{ConnectionState, Transport, TransportError},
};

// Mock implementation of a transport.
// Used where a test only needs to script send results.
mock! {
	pub EventTransport {}

	#[async_trait]
	impl Transport for EventTransport {
		async fn send(&self, message: OutboundMessage) -> Result<(), TransportError>;
		fn inbound(&self) -> Option<mpsc::Receiver<Value>>;
		fn state(&self) -> watch::Receiver<ConnectionState>;
		async fn close(&self) -> Result<(), TransportError>;
	}
}

/// Produces the server reply to an outbound message, if any
pub type Responder = Box<dyn Fn(&OutboundMessage) -> Option<Value> + Send + Sync>;

/// In-memory transport recording what the engine sends.
///
/// Tests push server messages with [`FakeTransport::push`] and drive the
/// connection lifecycle with [`FakeTransport::set_state`].
pub struct FakeTransport {
	sent: Mutex<Vec<OutboundMessage>>,
	inbound_tx: mpsc::Sender<Value>,
	inbound_rx: Mutex<Option<mpsc::Receiver<Value>>>,
	state: watch::Sender<ConnectionState>,
	responder: Mutex<Option<Responder>>,
	failing: AtomicBool,
}

impl FakeTransport {
	pub fn new() -> Arc<Self> {
		let (inbound_tx, inbound_rx) = mpsc::channel(256);
		let (state, _) = watch::channel(ConnectionState::Open);
		Arc::new(Self {
			sent: Mutex::new(Vec::new()),
			inbound_tx,
			inbound_rx: Mutex::new(Some(inbound_rx)),
			state,
			responder: Mutex::new(None),
			failing: AtomicBool::new(false),
		})
	}

	/// Replies to every sent message `responder` returns a value for.
	pub fn respond_with<F>(&self, responder: F)
	where
		F: Fn(&OutboundMessage) -> Option<Value> + Send + Sync + 'static,
	{
		*self.responder.lock() = Some(Box::new(responder));
	}

	pub fn fail_sends(&self, failing: bool) {
		self.failing.store(failing, Ordering::SeqCst);
	}

	pub async fn push(&self, message: Value) {
		self.inbound_tx
			.send(message)
			.await
			.expect("inbound stream closed");
	}

	pub fn set_state(&self, state: ConnectionState) {
		self.state.send_replace(state);
	}

	pub fn sent(&self) -> Vec<OutboundMessage> {
		self.sent.lock().clone()
	}

	pub fn sent_matching(&self, category_code: &str, event_code: &str) -> Vec<OutboundMessage> {
		self.sent()
			.into_iter()
			.filter(|message| {
				message.category_code == category_code && message.event_code == event_code
			})
			.collect()
	}

	pub fn clear_sent(&self) {
		self.sent.lock().clear();
	}
}

#[async_trait]
impl Transport for FakeTransport {
	async fn send(&self, message: OutboundMessage) -> Result<(), TransportError> {
		if self.failing.load(Ordering::SeqCst) {
			return Err(TransportError::send_error("connection is down"));
		}
		let reply = self
			.responder
			.lock()
			.as_ref()
			.and_then(|responder| responder(&message));
		self.sent.lock().push(message);
		if let Some(reply) = reply {
			let _ = self.inbound_tx.send(reply).await;
		}
		Ok(())
	}

	fn inbound(&self) -> Option<mpsc::Receiver<Value>> {
		self.inbound_rx.lock().take()
	}

	fn state(&self) -> watch::Receiver<ConnectionState> {
		self.state.subscribe()
	}

	async fn close(&self) -> Result<(), TransportError> {
		self.state.send_replace(ConnectionState::Closed);
		Ok(())
	}
}
