//! Request/response correlation over the event stream.

use dashmap::DashMap;
use std::{
	collections::VecDeque,
	sync::atomic::{AtomicU64, Ordering},
	time::Duration,
};
use tokio::{sync::oneshot, time::timeout};

use crate::models::ServerMessage;

/// Why a pending request produced no response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestFailure {
	TimedOut,
	/// The engine was destroyed while the request was outstanding
	Abandoned,
}

/// Handle of one registered request, used to withdraw exactly that request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTicket {
	key: String,
	id: u64,
}

impl RequestTicket {
	pub fn key(&self) -> &str {
		&self.key
	}
}

#[derive(Debug)]
struct Waiter {
	id: u64,
	sender: oneshot::Sender<ServerMessage>,
}

/// Outstanding requests keyed by event id or config scope.
///
/// Several requests may share a key (two configs for one scope); the server
/// answers them in the order they were sent, so responses complete the
/// oldest live waiter first.
#[derive(Debug, Default)]
pub struct PendingRequests {
	requests: DashMap<String, VecDeque<Waiter>>,
	next_id: AtomicU64,
}

impl PendingRequests {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn simulation_key(event_id: &str) -> String {
		format!("simulate:{}", event_id)
	}

	pub fn config_key(scope: &str) -> String {
		format!("config:{}", scope.to_lowercase())
	}

	/// Queues a request under `key` behind any already waiting there.
	pub fn register(&self, key: String) -> (RequestTicket, oneshot::Receiver<ServerMessage>) {
		let (sender, receiver) = oneshot::channel();
		let id = self.next_id.fetch_add(1, Ordering::Relaxed);
		self.requests
			.entry(key.clone())
			.or_default()
			.push_back(Waiter { id, sender });
		(RequestTicket { key, id }, receiver)
	}

	/// Completes the oldest live request under `key`, returning whether one was waiting.
	pub fn resolve(&self, key: &str, message: ServerMessage) -> bool {
		let delivered = match self.requests.get_mut(key) {
			Some(mut waiters) => {
				let mut message = message;
				let mut delivered = false;
				while let Some(waiter) = waiters.pop_front() {
					match waiter.sender.send(message) {
						Ok(()) => {
							delivered = true;
							break;
						}
						// Receiver already gone; offer the response to the next waiter.
						Err(returned) => message = returned,
					}
				}
				delivered
			}
			None => false,
		};
		self.requests.remove_if(key, |_, waiters| waiters.is_empty());
		delivered
	}

	/// Withdraws the request behind `ticket`, leaving others under its key alone.
	pub fn cancel(&self, ticket: &RequestTicket) {
		if let Some(mut waiters) = self.requests.get_mut(&ticket.key) {
			waiters.retain(|waiter| waiter.id != ticket.id);
		}
		self.requests
			.remove_if(&ticket.key, |_, waiters| waiters.is_empty());
	}

	pub fn len(&self) -> usize {
		self.requests.iter().map(|entry| entry.value().len()).sum()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Drops every outstanding request; their waiters see [`RequestFailure::Abandoned`].
	pub fn abandon_all(&self) {
		self.requests.clear();
	}

	/// Waits for the response to `ticket`, giving up after `wait`.
	pub async fn wait(
		&self,
		ticket: &RequestTicket,
		receiver: oneshot::Receiver<ServerMessage>,
		wait: Duration,
	) -> Result<ServerMessage, RequestFailure> {
		match timeout(wait, receiver).await {
			Ok(Ok(message)) => Ok(message),
			Ok(Err(_)) => Err(RequestFailure::Abandoned),
			Err(_) => {
				self.cancel(ticket);
				Err(RequestFailure::TimedOut)
			}
		}
	}
}
