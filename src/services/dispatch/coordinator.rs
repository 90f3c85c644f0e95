//! Dispatch coordinator.
//!
//! Routes every inbound event to the worker owning its key. The key is the
//! canonical transaction hash (after replacement aliases), or the first
//! watched address for events no transaction subscription cares about, so
//! events of one key are always handled by the same worker in arrival order.

use parking_lot::{Mutex, RwLock};
use std::{
	collections::hash_map::DefaultHasher,
	hash::{Hash, Hasher},
	sync::Arc,
};
use tokio::{
	sync::{mpsc, oneshot},
	task::JoinHandle,
};

use crate::{
	models::{ChainId, DispatchConfig, RateLimitConfig, TransactionEvent},
	services::{
		dispatch::{
			error::DispatchError,
			event::InboundEvent,
			report::DispatchReport,
			tracked::TrackedSnapshot,
			worker::{Command, TrackKey, TransactionHandler, Worker, WorkerContext},
		},
		filter::helpers::normalize_address,
		limiter::RateLimiter,
		registry::SubscriptionRegistry,
	},
};

pub struct Dispatcher {
	registry: Arc<SubscriptionRegistry>,
	limiter: Arc<RateLimiter>,
	handlers: Arc<RwLock<Vec<TransactionHandler>>>,
	workers: Vec<mpsc::Sender<Command>>,
	handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Dispatcher {
	/// Spawns the worker tasks. Must be called from within a tokio runtime.
	pub fn new(
		config: &DispatchConfig,
		rate_limit: &RateLimitConfig,
		registry: Arc<SubscriptionRegistry>,
	) -> Self {
		let limiter = Arc::new(RateLimiter::from_config(rate_limit));
		let handlers = Arc::new(RwLock::new(Vec::new()));
		let context = WorkerContext {
			registry: registry.clone(),
			limiter: limiter.clone(),
			policy: rate_limit.policy,
			queue_capacity: rate_limit.queue_capacity,
			listener_timeout: config.listener_timeout(),
			terminal_grace: config.terminal_grace(),
			handlers: handlers.clone(),
		};

		let count = config.workers.max(1);
		let mut workers = Vec::with_capacity(count);
		let mut handles = Vec::with_capacity(count);
		for index in 0..count {
			let (tx, rx) = mpsc::channel(config.channel_capacity.max(1));
			handles.push(tokio::spawn(Worker::new(index, rx, context.clone()).run()));
			workers.push(tx);
		}

		tracing::info!(
			workers = count,
			policy = ?rate_limit.policy,
			points = rate_limit.rules.points,
			duration_ms = rate_limit.rules.duration_ms,
			"dispatcher started"
		);

		Self {
			registry,
			limiter,
			handlers,
			workers,
			handles: Mutex::new(handles),
		}
	}

	pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
		&self.registry
	}

	pub fn limiter(&self) -> &Arc<RateLimiter> {
		&self.limiter
	}

	/// Adds a handler fed with every delivered event's folded outcome.
	pub fn add_transaction_handler<F>(&self, handler: F)
	where
		F: Fn(&TransactionEvent) + Send + Sync + 'static,
	{
		self.handlers.write().push(Arc::new(handler));
	}

	/// Dispatches `event` and waits for its report.
	///
	/// # Errors
	/// Returns [`DispatchError::ShutDown`] after [`Dispatcher::shutdown`] and
	/// [`DispatchError::WorkerUnavailable`] if the worker stopped before
	/// answering.
	pub async fn dispatch(&self, event: InboundEvent) -> Result<DispatchReport, DispatchError> {
		self.enqueue(event)
			.await?
			.await
			.map_err(|_| DispatchError::worker_unavailable("event dropped before it was reported"))
	}

	/// Queues `event` on its worker and returns the receiver of its report.
	///
	/// Events enqueued one after another keep their order per key even when
	/// their reports are awaited concurrently.
	pub async fn enqueue(
		&self,
		event: InboundEvent,
	) -> Result<oneshot::Receiver<DispatchReport>, DispatchError> {
		let (reply, report) = oneshot::channel();
		self.route(event, Some(reply)).await?;
		Ok(report)
	}

	/// Dispatches `event` without waiting for the outcome.
	pub async fn submit(&self, event: InboundEvent) -> Result<(), DispatchError> {
		self.route(event, None).await
	}

	async fn route(
		&self,
		event: InboundEvent,
		reply: Option<oneshot::Sender<DispatchReport>>,
	) -> Result<(), DispatchError> {
		let chain_id = event.chain_id();
		if let Some(old_hash) = event.transaction.replace_hash() {
			if self.registry.is_watching_transaction(&chain_id, old_hash) {
				self.registry
					.alias_transaction(&chain_id, old_hash, event.hash());
			}
		}

		let key = self.routing_key(&chain_id, &event);
		self.send(&key, Command::Dispatch { key: key.clone(), event, reply })
			.await
	}

	fn routing_key(&self, chain_id: &ChainId, event: &InboundEvent) -> TrackKey {
		if self.registry.is_watching_transaction(chain_id, event.hash()) {
			return (chain_id.clone(), self.registry.canonical_hash(chain_id, event.hash()));
		}
		let watched = event
			.candidate_addresses()
			.into_iter()
			.find(|address| self.registry.is_watching_account(chain_id, address));
		match watched {
			Some(address) => (chain_id.clone(), address),
			None => (chain_id.clone(), normalize_address(event.hash())),
		}
	}

	async fn send(&self, key: &TrackKey, command: Command) -> Result<(), DispatchError> {
		let worker = &self.workers[self.shard(key)];
		worker
			.send(command)
			.await
			.map_err(|_| DispatchError::shut_down(format!("no worker for {}/{}", key.0, key.1)))
	}

	fn shard(&self, key: &TrackKey) -> usize {
		let mut hasher = DefaultHasher::new();
		key.hash(&mut hasher);
		(hasher.finish() % self.workers.len() as u64) as usize
	}

	fn track_key(&self, chain_id: &ChainId, hash: &str) -> TrackKey {
		(chain_id.clone(), self.registry.canonical_hash(chain_id, hash))
	}

	/// Stops tracking a transaction; returns whether it was tracked.
	pub async fn untrack(&self, chain_id: &ChainId, hash: &str) -> Result<bool, DispatchError> {
		let key = self.track_key(chain_id, hash);
		let (reply, answer) = oneshot::channel();
		self.send(&key, Command::Untrack { key: key.clone(), reply })
			.await?;
		answer
			.await
			.map_err(|_| DispatchError::worker_unavailable("untrack was not answered"))
	}

	/// Current state of a tracked transaction, following replacement aliases.
	pub async fn tracked(
		&self,
		chain_id: &ChainId,
		hash: &str,
	) -> Result<Option<TrackedSnapshot>, DispatchError> {
		let key = self.track_key(chain_id, hash);
		let (reply, answer) = oneshot::channel();
		self.send(&key, Command::Snapshot { key: key.clone(), reply })
			.await?;
		answer
			.await
			.map_err(|_| DispatchError::worker_unavailable("snapshot was not answered"))
	}

	/// Stops every worker after the commands already queued were handled.
	pub async fn shutdown(&self) {
		for worker in &self.workers {
			let _ = worker.send(Command::Shutdown).await;
		}
		let handles: Vec<JoinHandle<()>> = self.handles.lock().drain(..).collect();
		for handle in handles {
			if let Err(e) = handle.await {
				tracing::warn!(error = %e, "dispatch worker ended abnormally");
			}
		}
		tracing::info!("dispatcher stopped");
	}
}
