//! Connection to the event server.
//!
//! The engine talks to the server through the [`Transport`] trait. Lifecycle
//! changes are observed through a watch channel of [`ConnectionState`]
//! instead of callbacks; [`WsTransport`] is the WebSocket implementation.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{mpsc, watch};

use crate::models::OutboundMessage;

mod config;
mod connection;
mod error;
mod ws;

pub use config::WsConfig;
pub use connection::{ConnectionState, ConnectionTracker};
pub use error::TransportError;
pub use ws::WsTransport;

/// Bidirectional message channel to the event server
#[async_trait]
pub trait Transport: Send + Sync {
	/// Writes a message to the server.
	async fn send(&self, message: OutboundMessage) -> Result<(), TransportError>;

	/// Takes the receiver of inbound server messages.
	///
	/// Only the first call returns the receiver.
	fn inbound(&self) -> Option<mpsc::Receiver<Value>>;

	/// Subscribes to connection state changes.
	fn state(&self) -> watch::Receiver<ConnectionState>;

	/// Closes the connection; no further messages are delivered.
	async fn close(&self) -> Result<(), TransportError>;
}
