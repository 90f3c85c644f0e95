//! Connection state tracking
//!
//! [`ConnectionState`] is what callers observe through the transport's watch
//! channel; [`ConnectionTracker`] is the bookkeeping the socket driver keeps
//! to decide which state comes next.

use std::{fmt, time::Duration};
use tokio::time::Instant;

/// Externally visible lifecycle of the transport connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
	/// First connection attempt in progress
	Connecting,
	/// Connected for the first time
	Open,
	/// Connection lost, reconnecting
	Down,
	/// Connected again after being down; subscriptions must be replayed
	Reopened,
	/// Reconnect attempts exhausted
	Errored,
	/// Closed by the caller
	Closed,
}

impl ConnectionState {
	pub fn is_connected(&self) -> bool {
		matches!(self, ConnectionState::Open | ConnectionState::Reopened)
	}

	/// No further transitions follow these states
	pub fn is_final(&self) -> bool {
		matches!(self, ConnectionState::Errored | ConnectionState::Closed)
	}
}

impl fmt::Display for ConnectionState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			ConnectionState::Connecting => "connecting",
			ConnectionState::Open => "open",
			ConnectionState::Down => "down",
			ConnectionState::Reopened => "reopened",
			ConnectionState::Errored => "errored",
			ConnectionState::Closed => "closed",
		};
		write!(f, "{}", name)
	}
}

/// Health and activity of the current socket
#[derive(Debug)]
pub struct ConnectionTracker {
	pub is_healthy: bool,
	/// Whether a connection was ever established
	pub has_connected: bool,
	/// Failed attempts since the last successful connect
	pub failed_attempts: u32,
	last_activity: Instant,
}

impl Default for ConnectionTracker {
	fn default() -> Self {
		Self {
			is_healthy: false,
			has_connected: false,
			failed_attempts: 0,
			last_activity: Instant::now(),
		}
	}
}

impl ConnectionTracker {
	/// Records a successful connect and returns the state to publish.
	pub fn connected(&mut self) -> ConnectionState {
		let state = if self.has_connected {
			ConnectionState::Reopened
		} else {
			ConnectionState::Open
		};
		self.is_healthy = true;
		self.has_connected = true;
		self.failed_attempts = 0;
		self.update_activity();
		state
	}

	/// Records a lost connection.
	pub fn disconnected(&mut self) -> ConnectionState {
		self.is_healthy = false;
		ConnectionState::Down
	}

	/// Records a failed attempt; returns `false` once `max_attempts` is exceeded.
	pub fn attempt_failed(&mut self, max_attempts: u32) -> bool {
		self.failed_attempts += 1;
		self.failed_attempts < max_attempts.max(1)
	}

	pub fn update_activity(&mut self) {
		self.last_activity = Instant::now();
	}

	/// Whether the socket has been quiet for at least `interval`.
	pub fn is_idle(&self, interval: Duration) -> bool {
		self.last_activity.elapsed() >= interval
	}
}
