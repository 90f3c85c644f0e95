//! Dispatch worker.
//!
//! Each worker owns a disjoint shard of routing keys and processes the
//! commands for its shard one at a time, which keeps the status updates of a
//! key in arrival order. Tracked transactions live in the worker that owns
//! their key and are never shared.

use parking_lot::RwLock;
use std::{
	collections::HashMap,
	panic::{catch_unwind, AssertUnwindSafe},
	sync::Arc,
	time::Duration,
};
use tokio::{
	sync::{mpsc, oneshot},
	time::{interval, sleep_until, Instant, MissedTickBehavior},
};

use crate::{
	models::{ChainId, EmitterPayload, EmitterResult, OverflowPolicy, TransactionEvent},
	services::{
		dispatch::{
			event::InboundEvent,
			invoke::invoke_listeners,
			report::{fold_results, DispatchOutcome, DispatchReport},
			tracked::{TrackedSnapshot, TrackedTransaction},
		},
		filter::{matches_all, Filter},
		limiter::{Backlog, RateLimitError, RateLimiter},
		registry::{Emitter, Resolved, SubscriptionRegistry},
	},
};

/// Callback fed with the folded outcome of every delivered event
pub type TransactionHandler = Arc<dyn Fn(&TransactionEvent) + Send + Sync>;

pub(crate) type TrackKey = (ChainId, String);

pub(crate) enum Command {
	Dispatch {
		key: TrackKey,
		event: InboundEvent,
		reply: Option<oneshot::Sender<DispatchReport>>,
	},
	Untrack {
		key: TrackKey,
		reply: oneshot::Sender<bool>,
	},
	Snapshot {
		key: TrackKey,
		reply: oneshot::Sender<Option<TrackedSnapshot>>,
	},
	Shutdown,
}

/// Settings every worker shares
#[derive(Clone)]
pub(crate) struct WorkerContext {
	pub registry: Arc<SubscriptionRegistry>,
	pub limiter: Arc<RateLimiter>,
	pub policy: OverflowPolicy,
	pub queue_capacity: usize,
	pub listener_timeout: Duration,
	pub terminal_grace: Duration,
	pub handlers: Arc<RwLock<Vec<TransactionHandler>>>,
}

/// Account subscription resolved for a candidate address
struct AccountTarget {
	address: String,
	emitter: Arc<Emitter>,
	filters: Arc<Vec<Filter>>,
}

/// An event that passed matching and waits for rate limiter admission
struct Emission {
	event: InboundEvent,
	targets: Vec<Arc<Emitter>>,
	report: DispatchReport,
	reply: Option<oneshot::Sender<DispatchReport>>,
}

pub(crate) struct Worker {
	index: usize,
	commands: mpsc::Receiver<Command>,
	context: WorkerContext,
	tracked: HashMap<TrackKey, TrackedTransaction>,
	backlog: Backlog<Emission>,
	/// When the backlog is next offered to the limiter
	drain_at: Option<Instant>,
}

impl Worker {
	pub fn new(index: usize, commands: mpsc::Receiver<Command>, context: WorkerContext) -> Self {
		let backlog = Backlog::new(context.queue_capacity);
		Self {
			index,
			commands,
			context,
			tracked: HashMap::new(),
			backlog,
			drain_at: None,
		}
	}

	pub async fn run(mut self) {
		let mut prune = interval(self.context.terminal_grace.max(Duration::from_millis(10)));
		prune.set_missed_tick_behavior(MissedTickBehavior::Delay);
		tracing::debug!(worker = self.index, "dispatch worker started");

		loop {
			let drain_at = self.drain_at.filter(|_| !self.backlog.is_empty());

			tokio::select! {
				command = self.commands.recv() => match command {
					Some(Command::Shutdown) | None => break,
					Some(command) => self.handle(command).await,
				},
				_ = sleep_until(drain_at.unwrap_or_else(Instant::now)), if drain_at.is_some() => {
					self.drain_backlog().await
				}
				_ = prune.tick() => self.prune(),
			}
		}

		if !self.backlog.is_empty() {
			tracing::warn!(worker = self.index, queued = self.backlog.len(), "dropping queued emissions on shutdown");
		}
		tracing::debug!(worker = self.index, "dispatch worker stopped");
	}

	async fn handle(&mut self, command: Command) {
		match command {
			Command::Dispatch { key, event, reply } => self.dispatch(key, event, reply).await,
			Command::Untrack { key, reply } => {
				let _ = reply.send(self.tracked.remove(&key).is_some());
			}
			Command::Snapshot { key, reply } => {
				let _ = reply.send(self.tracked.get(&key).map(TrackedTransaction::snapshot));
			}
			Command::Shutdown => {}
		}
	}

	async fn dispatch(
		&mut self,
		key: TrackKey,
		event: InboundEvent,
		reply: Option<oneshot::Sender<DispatchReport>>,
	) {
		let chain_id = event.chain_id();
		let mut report = DispatchReport::new(chain_id.clone(), event.hash(), event.event_code.clone());

		let (transaction, accounts) = self.resolve(&chain_id, &event);
		let mut targets: Vec<Arc<Emitter>> = Vec::new();

		if let Some((id, emitter)) = transaction {
			let tracked = self.tracked.entry(key.clone()).or_insert_with(|| {
				TrackedTransaction::new(&id, event.hash(), event.blockchain, emitter.id())
			});
			match tracked.apply(event.status_update(), &event.transaction) {
				Ok(transition) => {
					report.transition = Some(transition);
					targets.push(emitter);
				}
				Err(error) => {
					tracing::warn!(
						worker = self.index,
						hash = %event.hash(),
						error = %error,
						"ignoring event rejected by transaction status"
					);
					report.status_error = Some(error);
				}
			}
		}

		for account in accounts {
			if targets.iter().any(|target| target.id() == account.emitter.id()) {
				continue;
			}
			if matches_all(&event.raw, &account.filters) {
				targets.push(account.emitter);
			} else {
				tracing::trace!(address = %account.address, hash = %event.hash(), "account filters rejected event");
			}
		}

		report.matched = targets.len();
		if targets.is_empty() {
			tracing::debug!(worker = self.index, hash = %event.hash(), event_code = %event.event_code, "no subscription matched");
			respond(reply, report);
			return;
		}

		let emission = Emission {
			event,
			targets,
			report,
			reply,
		};
		self.admit(emission).await;
	}

	/// Transaction subscription for the hash, then account subscriptions for
	/// every candidate address.
	fn resolve(
		&self,
		chain_id: &ChainId,
		event: &InboundEvent,
	) -> (Option<(String, Arc<Emitter>)>, Vec<AccountTarget>) {
		let registry = &self.context.registry;
		let transaction = registry
			.resolve(chain_id, event.hash())
			.into_iter()
			.find_map(|resolved| match resolved {
				Resolved::Transaction { id, emitter } => Some((id, emitter)),
				Resolved::Account { .. } => None,
			});

		let mut accounts: Vec<AccountTarget> = Vec::new();
		for candidate in event.candidate_addresses() {
			for resolved in registry.resolve(chain_id, &candidate) {
				let Resolved::Account {
					address,
					emitter,
					filters,
				} = resolved
				else {
					continue;
				};
				if !accounts.iter().any(|seen| seen.emitter.id() == emitter.id()) {
					accounts.push(AccountTarget {
						address,
						emitter,
						filters,
					});
				}
			}
		}

		(transaction, accounts)
	}

	async fn admit(&mut self, emission: Emission) {
		let limiter = self.context.limiter.clone();
		match self.context.policy {
			OverflowPolicy::DropNewest => match limiter.try_acquire() {
				Ok(()) => self.deliver(emission).await,
				Err(error) => reject(emission, error),
			},
			OverflowPolicy::Block => match limiter.acquire().await {
				Ok(()) => self.deliver(emission).await,
				Err(error) => reject(emission, error),
			},
			OverflowPolicy::DropOldest => {
				if self.backlog.is_empty() {
					match limiter.try_acquire() {
						Ok(()) => {
							self.deliver(emission).await;
							return;
						}
						Err(RateLimitError::RateLimited { retry_after, .. }) => {
							self.schedule_drain(retry_after)
						}
						Err(error) => {
							reject(emission, error);
							return;
						}
					}
				}
				if let Some(evicted) = self.backlog.push(emission) {
					let capacity = self.backlog.capacity();
					reject(evicted, RateLimitError::Evicted { capacity });
				}
			}
		}
	}

	/// Delivers queued emissions, oldest first, while the bucket has tokens.
	async fn drain_backlog(&mut self) {
		self.drain_at = None;
		while let Some(emission) = self.backlog.pop() {
			match self.context.limiter.try_acquire() {
				Ok(()) => self.deliver(emission).await,
				Err(RateLimitError::RateLimited { retry_after, .. }) => {
					self.backlog.requeue(emission);
					self.schedule_drain(retry_after);
					break;
				}
				Err(error) => reject(emission, error),
			}
		}
	}

	fn schedule_drain(&mut self, after: Duration) {
		self.drain_at = Some(Instant::now() + after.max(Duration::from_millis(1)));
	}

	async fn deliver(&self, emission: Emission) {
		let Emission {
			event,
			targets,
			mut report,
			reply,
		} = emission;

		let status = event.status();
		let payload = Arc::new(EmitterPayload::Transaction(event.transaction));
		let mut results = Vec::new();

		for emitter in &targets {
			let invocation = invoke_listeners(
				emitter,
				&event.event_code,
				payload.clone(),
				self.context.listener_timeout,
			)
			.await;
			report.invoked += invocation.results.len();
			results.extend(invocation.results);
			report.failures.extend(invocation.failures);
		}

		let (emitter_result, decision) = fold_results(&results, status, &event.event_code);
		report.decision = Some(decision);
		report.outcome = DispatchOutcome::Delivered;

		tracing::debug!(
			worker = self.index,
			hash = %report.hash,
			event_code = %report.event_code,
			matched = report.matched,
			invoked = report.invoked,
			failures = report.failures.len(),
			"event dispatched"
		);

		self.notify_handlers(emitter_result, &payload);
		respond(reply, report);
	}

	fn notify_handlers(&self, emitter_result: EmitterResult, payload: &EmitterPayload) {
		let handlers = self.context.handlers.read().clone();
		if handlers.is_empty() {
			return;
		}
		let event = TransactionEvent {
			emitter_result,
			transaction: payload.clone(),
		};
		for handler in handlers {
			if catch_unwind(AssertUnwindSafe(|| handler(&event))).is_err() {
				tracing::warn!(worker = self.index, "transaction handler panicked");
			}
		}
	}

	fn prune(&mut self) {
		let grace = self.context.terminal_grace;
		let before = self.tracked.len();
		self.tracked.retain(|_, tracked| !tracked.is_expired(grace));
		let pruned = before - self.tracked.len();
		if pruned > 0 {
			tracing::debug!(worker = self.index, pruned, "pruned terminal transactions");
		}
	}
}

fn reject(emission: Emission, error: RateLimitError) {
	let Emission {
		mut report, reply, ..
	} = emission;
	tracing::warn!(hash = %report.hash, event_code = %report.event_code, error = %error, "emission rate limited");
	report.outcome = DispatchOutcome::RateLimited(error);
	respond(reply, report);
}

fn respond(reply: Option<oneshot::Sender<DispatchReport>>, report: DispatchReport) {
	if let Some(reply) = reply {
		let _ = reply.send(report);
	}
}
