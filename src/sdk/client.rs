//! Caller-facing engine.
//!
//! [`Sdk`] wires a [`Transport`] to the subscription registry and the
//! dispatcher. Two background tasks run for its lifetime: one drains the
//! inbound stream (events, request responses, server errors), the other
//! follows the connection state and replays every subscription after a
//! reconnect.

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::{
	collections::HashMap,
	panic::{catch_unwind, AssertUnwindSafe},
	sync::{
		atomic::{AtomicBool, Ordering},
		Arc,
	},
	time::Duration,
};
use tokio::{
	sync::{mpsc, watch},
	task::JoinHandle,
};

use crate::{
	models::{
		BitcoinTransactionLog, Blockchain, Config, ConfigLoader, EmitterPayload, EngineConfig,
		EthereumTransactionLog, EventObject, MultiSimOutput, Network, OutboundMessage, SdkError,
		ServerMessage, ServerStatus, SimulationTransaction, SimulationTransactionOutput, Status,
		Subscription, System, TransactionEvent, TransactionEventBody, TransactionEventCode,
		TransactionEventLog, TransactionEventObject,
	},
	sdk::{
		error::report_errors,
		requests::{PendingRequests, RequestFailure},
		simulator::TransportSimulator,
		stamp::MessageStamp,
		validation::{validate_address, validate_transaction_hash},
	},
	services::{
		dispatch::{invoke_listeners, Dispatcher, InboundEvent},
		filter::{helpers::normalize_address, parse_filters},
		registry::{Emitter, Resolved, SubscriptionRegistry},
		simulation::{simulate_all, Simulator},
		transport::{ConnectionState, Transport, WsConfig, WsTransport},
	},
};

/// Callback told about every reported error
pub type ErrorHook = Arc<dyn Fn(&SdkError) + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountDetails {
	pub address: String,
}

/// Accepted configuration; carries an emitter when the scope is now watched
#[derive(Debug, Clone)]
pub struct ConfigResponse {
	pub config: Config,
	pub emitter: Option<Arc<Emitter>>,
}

/// State shared with the background tasks
struct Shared {
	blockchain: Blockchain,
	stamp: MessageStamp,
	transport: Arc<dyn Transport>,
	registry: Arc<SubscriptionRegistry>,
	dispatcher: Arc<Dispatcher>,
	pending: Arc<PendingRequests>,
	/// Accepted configurations by lower-cased scope, replayed after a reconnect
	configs: DashMap<String, Config>,
	/// Caller supplied ids by normalised hash
	transaction_ids: DashMap<String, String>,
	/// Held while a config request is queued and sent so replies, which
	/// echo only the scope, arrive in the order the waiters were queued
	config_sends: tokio::sync::Mutex<()>,
	connection_id: RwLock<Option<String>>,
	error_hooks: RwLock<Vec<ErrorHook>>,
}

impl Shared {
	async fn send(&self, message: OutboundMessage) -> Result<(), SdkError> {
		self.transport
			.send(self.stamp.apply(message))
			.await
			.map_err(SdkError::from)
	}

	fn report(&self, error: SdkError) {
		tracing::warn!(
			message = %error.message,
			account = ?error.account,
			transaction = ?error.transaction,
			"engine error"
		);
		let hooks = self.error_hooks.read().clone();
		for hook in hooks {
			if catch_unwind(AssertUnwindSafe(|| hook(&error))).is_err() {
				tracing::warn!("error hook panicked");
			}
		}
	}

	/// Sends `message`; a failure is reported instead of returned because
	/// the subscription is replayed once the connection is back.
	async fn send_or_report(&self, message: OutboundMessage) {
		if let Err(error) = self.send(message).await {
			self.report(error);
		}
	}
}

pub struct Sdk {
	shared: Arc<Shared>,
	simulator: TransportSimulator,
	request_timeout: Duration,
	listener_timeout: Duration,
	tasks: Mutex<Vec<JoinHandle<()>>>,
	destroyed: AtomicBool,
}

impl Sdk {
	/// Connects to the configured endpoint over WebSocket.
	pub async fn connect(config: EngineConfig) -> Result<Self, SdkError> {
		config.validate()?;
		let transport = WsTransport::connect(config.endpoint(), WsConfig::from(&config.ws)).await?;
		Self::with_transport(config, Arc::new(transport)).await
	}

	/// Builds the engine on top of an already connected transport.
	///
	/// # Errors
	/// Fails if the configuration is invalid, the transport's inbound stream
	/// was already taken, or the initial handshake cannot be sent.
	pub async fn with_transport(
		config: EngineConfig,
		transport: Arc<dyn Transport>,
	) -> Result<Self, SdkError> {
		config.validate()?;
		let blockchain = config.blockchain()?;
		let inbound = transport
			.inbound()
			.ok_or_else(|| SdkError::new("Transport inbound stream is already in use"))?;

		let stamp = MessageStamp {
			dapp_id: config.dapp_id.clone(),
			version: env!("CARGO_PKG_VERSION").to_string(),
			app_name: config.name.clone(),
			app_version: config.app_version.clone(),
			blockchain,
		};
		let registry = Arc::new(SubscriptionRegistry::new());
		let dispatcher = Arc::new(Dispatcher::new(
			&config.dispatch,
			&config.rate_limit,
			registry.clone(),
		));
		let pending = Arc::new(PendingRequests::new());

		let shared = Arc::new(Shared {
			blockchain,
			stamp: stamp.clone(),
			transport: transport.clone(),
			registry,
			dispatcher,
			pending: pending.clone(),
			configs: DashMap::new(),
			transaction_ids: DashMap::new(),
			config_sends: tokio::sync::Mutex::new(()),
			connection_id: RwLock::new(None),
			error_hooks: RwLock::new(Vec::new()),
		});

		let tasks = vec![
			tokio::spawn(pump(shared.clone(), inbound)),
			tokio::spawn(follow_connection(shared.clone(), transport.state())),
		];

		let sdk = Self {
			simulator: TransportSimulator::new(transport, pending, stamp, config.request_timeout()),
			shared,
			request_timeout: config.request_timeout(),
			listener_timeout: config.dispatch.listener_timeout(),
			tasks: Mutex::new(tasks),
			destroyed: AtomicBool::new(false),
		};
		sdk.shared.send(OutboundMessage::initialize(None)).await?;
		tracing::info!(chain_id = %blockchain.chain_id(), system = %blockchain.system, network = %blockchain.network, "engine initialised");
		Ok(sdk)
	}

	pub fn blockchain(&self) -> Blockchain {
		self.shared.blockchain
	}

	pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
		&self.shared.registry
	}

	pub fn dispatcher(&self) -> &Arc<Dispatcher> {
		&self.shared.dispatcher
	}

	/// Connection id assigned by the server, once the handshake completed
	pub fn connection_id(&self) -> Option<String> {
		self.shared.connection_id.read().clone()
	}

	pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
		self.shared.transport.state()
	}

	/// Adds a hook told about rate limiting, listener failures, rejected
	/// status updates, server errors and connection loss.
	pub fn on_error<F>(&self, hook: F)
	where
		F: Fn(&SdkError) + Send + Sync + 'static,
	{
		self.shared.error_hooks.write().push(Arc::new(hook));
	}

	pub fn add_transaction_handler<F>(&self, handler: F)
	where
		F: Fn(&TransactionEvent) + Send + Sync + 'static,
	{
		self.shared.dispatcher.add_transaction_handler(handler);
	}

	fn ensure_alive(&self) -> Result<(), SdkError> {
		if self.destroyed.load(Ordering::SeqCst) {
			return Err(SdkError::new("Engine has been destroyed"));
		}
		Ok(())
	}

	/// Starts watching a transaction.
	///
	/// Watching a hash that is already watched returns its existing emitter.
	pub async fn transaction(
		&self,
		hash: &str,
		id: Option<&str>,
	) -> Result<(TransactionEventLog, Arc<Emitter>), SdkError> {
		self.ensure_alive()?;
		let system = self.shared.blockchain.system;
		validate_transaction_hash(system, hash)?;

		let chain_id = self.shared.blockchain.chain_id();
		let id = id.unwrap_or(hash).to_string();
		let registry = &self.shared.registry;
		let handle = registry
			.register(
				&Subscription::transaction(hash, chain_id.clone()),
				Arc::new(Emitter::new()),
			)
			.map_err(|e| SdkError::from(e).for_transaction(hash))?;
		let emitter = registry
			.resolve(&chain_id, hash)
			.into_iter()
			.find_map(|resolved| match resolved {
				Resolved::Transaction { emitter, .. } if emitter.id() == handle.emitter => {
					Some(emitter)
				}
				_ => None,
			})
			.ok_or_else(|| SdkError::new("Transaction subscription was removed").for_transaction(hash))?;

		self.shared
			.transaction_ids
			.insert(handle.key.clone(), id.clone());
		self.shared
			.send_or_report(OutboundMessage::watch_transaction(hash, &id))
			.await;

		Ok((transaction_log(system, hash, &id), emitter))
	}

	/// Starts watching an account with a fresh emitter.
	pub async fn account(&self, address: &str) -> Result<(AccountDetails, Arc<Emitter>), SdkError> {
		self.ensure_alive()?;
		validate_address(self.shared.blockchain.system, address)?;

		let emitter = Arc::new(Emitter::new());
		self.shared
			.registry
			.register(
				&Subscription::account(address, self.shared.blockchain.chain_id()),
				emitter.clone(),
			)
			.map_err(|e| SdkError::from(e).for_account(address))?;
		self.shared
			.send_or_report(OutboundMessage::watch_account(address))
			.await;

		Ok((
			AccountDetails {
				address: address.to_string(),
			},
			emitter,
		))
	}

	/// Forwards a caller event to the server.
	///
	/// Transaction events for a watched hash are also emitted locally, so
	/// listeners see codes such as `txSent` that only the caller knows about.
	pub async fn event(&self, event: EventObject) -> Result<(), SdkError> {
		self.ensure_alive()?;
		if let EventObject::Transaction(transaction) = &event {
			self.emit_local(transaction).await;
		}
		self.shared.send(OutboundMessage::from_event(&event)).await
	}

	async fn emit_local(&self, event: &TransactionEventObject) {
		let (base, hash) = match &event.transaction {
			TransactionEventBody::Ethereum { base, hash } => (base, hash),
			TransactionEventBody::Bitcoin { base, txid } => (base, txid),
			_ => return,
		};
		let chain_id = self.shared.blockchain.chain_id();
		let Some(emitter) = self
			.shared
			.registry
			.resolve(&chain_id, hash)
			.into_iter()
			.find_map(|resolved| match resolved {
				Resolved::Transaction { emitter, .. } => Some(emitter),
				Resolved::Account { .. } => None,
			})
		else {
			return;
		};

		let id = base.id.clone().unwrap_or_else(|| hash.clone());
		let status = base
			.status
			.clone()
			.unwrap_or_else(|| Status::Pending.to_string());
		let log = match transaction_log(self.shared.blockchain.system, hash, &id) {
			TransactionEventLog::Ethereum(log) => TransactionEventLog::Ethereum(EthereumTransactionLog {
				start_time: base.start_time.or(log.start_time),
				status,
				event_code: event.base.event_code.clone(),
				..log
			}),
			TransactionEventLog::Bitcoin(log) => TransactionEventLog::Bitcoin(BitcoinTransactionLog {
				start_time: base.start_time.or(log.start_time),
				status,
				event_code: event.base.event_code.clone(),
				..log
			}),
		};
		let code = TransactionEventCode::from(event.base.event_code.as_str());
		let invocation = invoke_listeners(
			&emitter,
			&code,
			Arc::new(EmitterPayload::Log(log)),
			self.listener_timeout,
		)
		.await;
		for failure in invocation.failures {
			self.shared.report(
				SdkError::new("Listener failed")
					.with_error(failure)
					.for_transaction(hash.as_str()),
			);
		}
	}

	/// Stops watching a hash or an address.
	pub async fn unsubscribe(&self, address_or_hash: &str) -> Result<(), SdkError> {
		self.ensure_alive()?;
		let chain_id = self.shared.blockchain.chain_id();
		let registry = &self.shared.registry;

		let is_transaction = registry.is_watching_transaction(&chain_id, address_or_hash);
		let canonical = registry.canonical_hash(&chain_id, address_or_hash);
		if !registry.unregister_key(&chain_id, address_or_hash) {
			return Err(SdkError::new("Not subscribed").for_account(address_or_hash));
		}
		self.shared
			.configs
			.remove(&address_or_hash.to_lowercase());

		if is_transaction {
			self.shared.transaction_ids.remove(&canonical);
			self.shared.dispatcher.untrack(&chain_id, &canonical).await?;
			self.shared
				.send_or_report(OutboundMessage::unwatch_transaction(address_or_hash))
				.await;
		} else {
			self.shared
				.send_or_report(OutboundMessage::unwatch_account(address_or_hash))
				.await;
		}
		tracing::debug!(key = %address_or_hash, "unsubscribed");
		Ok(())
	}

	/// Sends a configuration and installs it once the server accepted it.
	///
	/// The `global` scope applies its filters to every watched account.
	/// With `watch_address` set, the scope is watched and the response
	/// carries its emitter.
	pub async fn config(&self, config: Config) -> Result<ConfigResponse, SdkError> {
		self.ensure_alive()?;
		let filters = config.filters.clone().unwrap_or_default();
		parse_filters(&filters).map_err(|e| SdkError::from(e).for_account(&config.scope))?;
		if !config.is_global() {
			validate_address(self.shared.blockchain.system, &config.scope)?;
		}

		let key = PendingRequests::config_key(&config.scope);
		let pending = &self.shared.pending;
		let (ticket, receiver) = {
			let _order = self.shared.config_sends.lock().await;
			let (ticket, receiver) = pending.register(key);
			if let Err(error) = self.shared.send(OutboundMessage::put_config(&config)).await {
				pending.cancel(&ticket);
				return Err(error.for_account(&config.scope));
			}
			(ticket, receiver)
		};
		let response = pending
			.wait(&ticket, receiver, self.request_timeout)
			.await
			.map_err(|failure| {
				let message = match failure {
					RequestFailure::TimedOut => "Configuration request timed out",
					RequestFailure::Abandoned => "Engine has been destroyed",
				};
				SdkError::new(message).for_account(&config.scope)
			})?;
		if response.status == ServerStatus::Error {
			let reason = response
				.reason
				.unwrap_or_else(|| "Configuration rejected".to_string());
			return Err(SdkError::new(reason).for_account(&config.scope));
		}

		let chain_id = self.shared.blockchain.chain_id();
		let registry = &self.shared.registry;
		let emitter = if config.is_global() {
			registry.set_global_filters(&chain_id, filters)?;
			None
		} else if config.watch_address == Some(true) {
			let emitter = Arc::new(Emitter::new());
			let subscription = Subscription::Account {
				id: config.scope.clone(),
				chain_id,
				filters: config.filters.clone(),
				abi: config.abi.clone(),
			};
			registry
				.register(&subscription, emitter.clone())
				.map_err(|e| SdkError::from(e).for_account(&config.scope))?;
			Some(emitter)
		} else {
			registry.set_account_filters(&chain_id, &config.scope, filters)?;
			None
		};

		self.shared
			.configs
			.insert(config.scope.to_lowercase(), config.clone());
		tracing::debug!(scope = %config.scope, "configuration accepted");
		Ok(ConfigResponse { config, emitter })
	}

	pub async fn simulate(
		&self,
		system: System,
		network: Network,
		transaction: SimulationTransaction,
	) -> Result<SimulationTransactionOutput, SdkError> {
		self.ensure_alive()?;
		Ok(self.simulator.simulate(system, network, transaction).await?)
	}

	/// Simulates every transaction and aggregates the results in input order.
	pub async fn multi_simulate(
		&self,
		system: System,
		network: Network,
		transactions: Vec<SimulationTransaction>,
	) -> Result<MultiSimOutput, SdkError> {
		self.ensure_alive()?;
		Ok(simulate_all(&self.simulator, system, network, &transactions).await?)
	}

	/// Drops every subscription, stops the workers and closes the transport.
	///
	/// Later calls to any other operation fail.
	pub async fn destroy(&self) {
		if self.destroyed.swap(true, Ordering::SeqCst) {
			return;
		}
		self.shared.pending.abandon_all();
		self.shared.registry.clear();
		self.shared.configs.clear();
		self.shared.transaction_ids.clear();
		self.shared.dispatcher.shutdown().await;
		if let Err(e) = self.shared.transport.close().await {
			tracing::warn!(error = %e, "closing transport failed");
		}
		for task in self.tasks.lock().drain(..) {
			task.abort();
		}
		tracing::info!("engine destroyed");
	}
}

impl Drop for Sdk {
	fn drop(&mut self) {
		for task in self.tasks.lock().drain(..) {
			task.abort();
		}
	}
}

fn transaction_log(system: System, hash: &str, id: &str) -> TransactionEventLog {
	let start_time = u64::try_from(chrono::Utc::now().timestamp_millis()).ok();
	let status = Status::Pending.to_string();
	let event_code = TransactionEventCode::TxSent.to_string();
	match system {
		System::Ethereum => TransactionEventLog::Ethereum(EthereumTransactionLog {
			id: id.to_string(),
			start_time,
			status,
			event_code,
			hash: hash.to_string(),
			..Default::default()
		}),
		System::Bitcoin => TransactionEventLog::Bitcoin(BitcoinTransactionLog {
			id: id.to_string(),
			start_time,
			status,
			event_code,
			txid: Some(hash.to_string()),
			extra: HashMap::new(),
		}),
	}
}

async fn pump(shared: Arc<Shared>, mut inbound: mpsc::Receiver<Value>) {
	while let Some(value) = inbound.recv().await {
		match serde_json::from_value::<ServerMessage>(value) {
			Ok(message) => handle_message(&shared, message).await,
			Err(e) => tracing::warn!(error = %e, "dropping unreadable server message"),
		}
	}
	tracing::debug!("inbound stream ended");
}

async fn handle_message(shared: &Arc<Shared>, message: ServerMessage) {
	if let Some(id) = &message.connection_id {
		*shared.connection_id.write() = Some(id.clone());
	}

	let Some(event) = &message.event else {
		if message.status == ServerStatus::Error {
			let reason = message.reason.clone().unwrap_or_else(|| "Server error".to_string());
			shared.report(SdkError::new(reason));
		}
		return;
	};

	if let Some(event_id) = &event.event_id {
		let key = PendingRequests::simulation_key(event_id);
		if shared.pending.resolve(&key, message.clone()) {
			return;
		}
	}
	if let Some(config) = &event.config {
		let key = PendingRequests::config_key(&config.scope);
		if shared.pending.resolve(&key, message.clone()) {
			return;
		}
	}

	if message.status == ServerStatus::Error {
		let reason = message.reason.clone().unwrap_or_else(|| "Server error".to_string());
		let mut error = SdkError::new(reason);
		if let Some(account) = &event.account {
			error = error.for_account(&account.address);
		}
		let hash = event
			.transaction
			.as_ref()
			.and_then(|transaction| transaction.get("hash").or_else(|| transaction.get("txid")))
			.and_then(Value::as_str);
		if let Some(hash) = hash {
			error = error.for_transaction(hash);
		}
		shared.report(error);
		return;
	}

	let Some(event) = message.event else {
		return;
	};
	if event.transaction.is_none() {
		tracing::trace!(category = %event.category_code, event_code = %event.event_code, "ignoring event without transaction");
		return;
	}

	let inbound = match InboundEvent::from_server_event(event, shared.blockchain) {
		Ok(inbound) => inbound,
		Err(error) => return shared.report(error.into()),
	};
	match shared.dispatcher.enqueue(inbound).await {
		Ok(report) => {
			let shared = shared.clone();
			tokio::spawn(async move {
				if let Ok(report) = report.await {
					for error in report_errors(&report) {
						shared.report(error);
					}
				}
			});
		}
		Err(error) => shared.report(error.into()),
	}
}

async fn follow_connection(shared: Arc<Shared>, mut state: watch::Receiver<ConnectionState>) {
	while state.changed().await.is_ok() {
		let current = *state.borrow_and_update();
		match current {
			ConnectionState::Reopened => {
				let replayed = replay(&shared).await;
				tracing::info!(replayed, "connection reopened, subscriptions replayed");
			}
			ConnectionState::Down => shared.report(SdkError::new("Connection lost")),
			ConnectionState::Errored => {
				shared.report(SdkError::new("Connection failed, giving up reconnecting"));
				break;
			}
			ConnectionState::Closed => break,
			ConnectionState::Connecting | ConnectionState::Open => {}
		}
	}
}

/// Re-sends the handshake, every live subscription and every accepted
/// configuration. Returns how many messages were sent.
async fn replay(shared: &Shared) -> usize {
	let connection_id = shared.connection_id.read().clone();
	let mut messages = vec![OutboundMessage::initialize(connection_id.as_deref())];

	for subscription in shared.registry.subscriptions() {
		match &subscription {
			Subscription::Transaction { id, .. } => {
				let caller_id = shared
					.transaction_ids
					.get(&normalize_address(id))
					.map(|entry| entry.value().clone())
					.unwrap_or_else(|| id.clone());
				messages.push(OutboundMessage::watch_transaction(id, &caller_id));
			}
			Subscription::Account { id, .. } => {
				messages.push(OutboundMessage::watch_account(id));
			}
		}
	}
	for config in shared.configs.iter() {
		messages.push(OutboundMessage::put_config(config.value()));
	}

	let total = messages.len();
	for (sent, message) in messages.into_iter().enumerate() {
		if let Err(error) = shared.send(message).await {
			shared.report(error);
			return sent;
		}
	}
	total
}
