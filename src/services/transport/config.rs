//! WebSocket transport configuration
//!
//! Heartbeat, reconnect and connection timeouts for the event server socket.

use std::time::Duration;

use crate::models::WsSettings;

/// WebSocket configuration for the event server connection
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WsConfig {
	/// How often to send keep-alive pings on an idle connection
	pub heartbeat_interval: Duration,
	/// How long to wait between reconnect attempts
	pub reconnect_timeout: Duration,
	/// How many consecutive reconnect attempts are made before giving up
	pub max_reconnect_attempts: u32,
	/// How long to wait for a connection to be established
	pub connection_timeout: Duration,
}

impl Default for WsConfig {
	fn default() -> Self {
		Self::from(&WsSettings::default())
	}
}

impl From<&WsSettings> for WsConfig {
	fn from(settings: &WsSettings) -> Self {
		Self {
			heartbeat_interval: Duration::from_millis(settings.heartbeat_interval_ms),
			reconnect_timeout: Duration::from_millis(settings.reconnect_timeout_ms),
			max_reconnect_attempts: settings.max_reconnect_attempts,
			connection_timeout: Duration::from_millis(settings.connection_timeout_ms),
		}
	}
}

impl WsConfig {
	pub fn new() -> Self {
		Self::default()
	}

	/// Configuration with a single short connection attempt
	///
	/// Mostly for testing purposes
	pub fn single_attempt() -> Self {
		Self {
			heartbeat_interval: Duration::from_secs(30),
			reconnect_timeout: Duration::from_secs(1),
			max_reconnect_attempts: 1,
			connection_timeout: Duration::from_secs(1),
		}
	}

	pub fn with_heartbeat_interval(mut self, heartbeat_interval: Duration) -> Self {
		self.heartbeat_interval = heartbeat_interval;
		self
	}

	pub fn with_reconnect_timeout(mut self, reconnect_timeout: Duration) -> Self {
		self.reconnect_timeout = reconnect_timeout;
		self
	}

	pub fn with_max_reconnect_attempts(mut self, max_reconnect_attempts: u32) -> Self {
		self.max_reconnect_attempts = max_reconnect_attempts;
		self
	}

	pub fn with_connection_timeout(mut self, connection_timeout: Duration) -> Self {
		self.connection_timeout = connection_timeout;
		self
	}
}
