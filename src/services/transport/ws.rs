//! WebSocket transport for the event server.
//!
//! A single driver task owns the socket. It reconnects after the connection
//! drops, publishes every lifecycle change on a watch channel and forwards
//! inbound JSON frames to the engine.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::{
	net::TcpStream,
	sync::{mpsc, watch},
	task::JoinHandle,
	time::{interval, sleep, timeout, MissedTickBehavior},
};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use url::Url;

use crate::{
	models::OutboundMessage,
	services::transport::{
		config::WsConfig,
		connection::{ConnectionState, ConnectionTracker},
		error::TransportError,
		Transport,
	},
};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

const INBOUND_CAPACITY: usize = 1024;

/// How a connected session ended
enum SessionEnd {
	Shutdown,
	Lost(String),
}

/// Reconnecting WebSocket client
#[derive(Debug)]
pub struct WsTransport {
	url: Url,
	outbound: mpsc::UnboundedSender<Message>,
	inbound: Mutex<Option<mpsc::Receiver<Value>>>,
	state: watch::Receiver<ConnectionState>,
	shutdown: watch::Sender<bool>,
	driver: Mutex<Option<JoinHandle<()>>>,
}

impl WsTransport {
	/// Connects to `url` and waits for the first connection to open.
	///
	/// # Errors
	/// Returns [`TransportError::ConnectionError`] if the url is not a
	/// `ws`/`wss` url or every connection attempt fails.
	pub async fn connect(url: &str, config: WsConfig) -> Result<Self, TransportError> {
		let url = Url::parse(url)
			.map_err(|e| TransportError::connection_error(format!("invalid url {}: {}", url, e)))?;
		if !matches!(url.scheme(), "ws" | "wss") {
			return Err(TransportError::connection_error(format!(
				"unsupported scheme {}",
				url.scheme()
			)));
		}

		let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
		let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_CAPACITY);
		let (state_tx, mut state_rx) = watch::channel(ConnectionState::Connecting);
		let (shutdown_tx, shutdown_rx) = watch::channel(false);

		let driver = tokio::spawn(drive(
			url.clone(),
			config,
			outbound_rx,
			inbound_tx,
			state_tx,
			shutdown_rx,
		));

		let initial = state_rx
			.wait_for(|state| *state != ConnectionState::Connecting)
			.await
			.map(|state| *state)
			.unwrap_or(ConnectionState::Errored);
		if !initial.is_connected() {
			driver.abort();
			return Err(TransportError::connection_error(format!(
				"could not connect to {}",
				url
			)));
		}

		tracing::info!(url = %url, "websocket transport connected");
		Ok(Self {
			url,
			outbound: outbound_tx,
			inbound: Mutex::new(Some(inbound_rx)),
			state: state_rx,
			shutdown: shutdown_tx,
			driver: Mutex::new(Some(driver)),
		})
	}

	pub fn url(&self) -> &Url {
		&self.url
	}
}

#[async_trait]
impl Transport for WsTransport {
	async fn send(&self, message: OutboundMessage) -> Result<(), TransportError> {
		if self.state.borrow().is_final() {
			return Err(TransportError::Closed);
		}
		let text = serde_json::to_string(&message)
			.map_err(|e| TransportError::protocol_error(e.to_string()))?;
		tracing::trace!(category = %message.category_code, event = %message.event_code, "sending message");
		self.outbound
			.send(Message::text(text))
			.map_err(|_| TransportError::Closed)
	}

	fn inbound(&self) -> Option<mpsc::Receiver<Value>> {
		self.inbound.lock().take()
	}

	fn state(&self) -> watch::Receiver<ConnectionState> {
		self.state.clone()
	}

	async fn close(&self) -> Result<(), TransportError> {
		self.shutdown.send_replace(true);
		let driver = self.driver.lock().take();
		if let Some(driver) = driver {
			driver
				.await
				.map_err(|e| TransportError::connection_error(e.to_string()))?;
		}
		Ok(())
	}
}

impl Drop for WsTransport {
	fn drop(&mut self) {
		self.shutdown.send_replace(true);
	}
}

async fn drive(
	url: Url,
	config: WsConfig,
	mut outbound: mpsc::UnboundedReceiver<Message>,
	inbound: mpsc::Sender<Value>,
	state: watch::Sender<ConnectionState>,
	mut shutdown: watch::Receiver<bool>,
) {
	let mut tracker = ConnectionTracker::default();

	loop {
		let socket = match timeout(config.connection_timeout, connect_async(url.as_str())).await {
			Ok(Ok((socket, _))) => Some(socket),
			Ok(Err(e)) => {
				tracing::warn!(url = %url, error = %e, "websocket connect failed");
				None
			}
			Err(_) => {
				tracing::warn!(url = %url, timeout_ms = config.connection_timeout.as_millis() as u64, "websocket connect timed out");
				None
			}
		};

		let Some(socket) = socket else {
			if !tracker.attempt_failed(config.max_reconnect_attempts) {
				tracing::error!(url = %url, attempts = tracker.failed_attempts, "giving up reconnecting");
				state.send_replace(ConnectionState::Errored);
				return;
			}
			if wait_or_shutdown(&config, &mut shutdown).await {
				state.send_replace(ConnectionState::Closed);
				return;
			}
			continue;
		};

		let connected = tracker.connected();
		tracing::debug!(url = %url, state = %connected, "websocket connected");
		state.send_replace(connected);

		match run_session(socket, &config, &mut tracker, &mut outbound, &inbound, &mut shutdown).await
		{
			SessionEnd::Shutdown => {
				state.send_replace(ConnectionState::Closed);
				return;
			}
			SessionEnd::Lost(reason) => {
				tracing::warn!(url = %url, reason = %reason, "websocket connection lost");
				state.send_replace(tracker.disconnected());
				if wait_or_shutdown(&config, &mut shutdown).await {
					state.send_replace(ConnectionState::Closed);
					return;
				}
			}
		}
	}
}

/// Sleeps for the reconnect timeout; returns `true` if shutdown was requested meanwhile.
async fn wait_or_shutdown(config: &WsConfig, shutdown: &mut watch::Receiver<bool>) -> bool {
	if *shutdown.borrow() {
		return true;
	}
	tokio::select! {
		_ = sleep(config.reconnect_timeout) => false,
		_ = shutdown.changed() => true,
	}
}

async fn run_session(
	socket: Socket,
	config: &WsConfig,
	tracker: &mut ConnectionTracker,
	outbound: &mut mpsc::UnboundedReceiver<Message>,
	inbound: &mpsc::Sender<Value>,
	shutdown: &mut watch::Receiver<bool>,
) -> SessionEnd {
	let (mut write, mut read) = socket.split();
	let mut heartbeat = interval(config.heartbeat_interval);
	heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
	heartbeat.tick().await;

	loop {
		if *shutdown.borrow() {
			let _ = write.send(Message::Close(None)).await;
			return SessionEnd::Shutdown;
		}

		tokio::select! {
			_ = shutdown.changed() => {
				let _ = write.send(Message::Close(None)).await;
				return SessionEnd::Shutdown;
			}
			message = outbound.recv() => match message {
				Some(message) => {
					if let Err(e) = write.send(message).await {
						return SessionEnd::Lost(e.to_string());
					}
					tracker.update_activity();
				}
				None => {
					let _ = write.send(Message::Close(None)).await;
					return SessionEnd::Shutdown;
				}
			},
			frame = read.next() => match frame {
				Some(Ok(Message::Text(text))) => {
					tracker.update_activity();
					match serde_json::from_str::<Value>(&text) {
						Ok(value) => {
							if inbound.send(value).await.is_err() {
								return SessionEnd::Shutdown;
							}
						}
						Err(e) => tracing::warn!(error = %e, "dropping non-JSON frame"),
					}
				}
				Some(Ok(Message::Ping(payload))) => {
					tracker.update_activity();
					if let Err(e) = write.send(Message::Pong(payload)).await {
						return SessionEnd::Lost(e.to_string());
					}
				}
				Some(Ok(Message::Close(frame))) => {
					return SessionEnd::Lost(format!("closed by server: {:?}", frame));
				}
				Some(Ok(_)) => tracker.update_activity(),
				Some(Err(e)) => return SessionEnd::Lost(e.to_string()),
				None => return SessionEnd::Lost("stream ended".to_string()),
			},
			_ = heartbeat.tick() => {
				if tracker.is_idle(config.heartbeat_interval) {
					if let Err(e) = write.send(Message::Ping(Default::default())).await {
						return SessionEnd::Lost(e.to_string());
					}
				}
			}
		}
	}
}
