//! Integration tests for event dispatch across workers.

use chain_event_engine::{
	models::{
		Blockchain, ChainId, DispatchConfig, EmitterPayload, Network, OverflowPolicy,
		RateLimitConfig, Status, Subscription, System, TransactionEventCode,
	},
	services::{
		dispatch::{DispatchOutcome, Dispatcher, InboundEvent, ListenerFailure},
		registry::{Emitter, SubscriptionRegistry},
	},
	utils::tests::builders::transaction::TransactionBuilder,
};
use parking_lot::Mutex;
use serde_json::json;
use std::{
	sync::{
		atomic::{AtomicUsize, Ordering},
		Arc,
	},
	time::Duration,
};

const WATCHED: &str = "0x3333333333333333333333333333333333333333";

fn mainnet() -> Blockchain {
	Blockchain::new(System::Ethereum, Network::Main)
}

fn chain() -> ChainId {
	mainnet().chain_id()
}

fn hash(n: u64) -> String {
	format!("0x{:064x}", n)
}

fn event(builder: TransactionBuilder, code: TransactionEventCode) -> InboundEvent {
	InboundEvent::new(mainnet(), code, builder.build()).unwrap()
}

fn dispatch_config(workers: usize) -> DispatchConfig {
	DispatchConfig {
		workers,
		..DispatchConfig::default()
	}
}

/// Emitter recording `(hash, status)` for every event it receives
fn recording_emitter() -> (Arc<Emitter>, Arc<Mutex<Vec<(String, Status)>>>) {
	let emitter = Arc::new(Emitter::new());
	let seen = Arc::new(Mutex::new(Vec::new()));
	let sink = seen.clone();
	emitter.on(TransactionEventCode::All, move |payload: &EmitterPayload| {
		if let Some(tx) = payload.as_transaction() {
			sink.lock().push((tx.hash().to_string(), tx.status()));
		}
	});
	(emitter, seen)
}

#[tokio::test]
async fn test_per_transaction_order_survives_sharding() {
	let registry = Arc::new(SubscriptionRegistry::new());
	let (emitter, seen) = recording_emitter();
	for n in 0..8 {
		registry
			.register(&Subscription::transaction(hash(n), chain()), emitter.clone())
			.unwrap();
	}
	let dispatcher = Dispatcher::new(&dispatch_config(4), &RateLimitConfig::default(), registry);

	let mut receivers = Vec::new();
	for (status, code) in [
		(Status::Pending, TransactionEventCode::TxPool),
		(Status::Confirmed, TransactionEventCode::TxConfirmed),
	] {
		for n in 0..8 {
			let builder = TransactionBuilder::new().hash(&hash(n)).status(status);
			receivers.push(dispatcher.enqueue(event(builder, code.clone())).await.unwrap());
		}
	}
	for receiver in receivers {
		let report = receiver.await.unwrap();
		assert!(report.is_delivered(), "{:?}", report.outcome);
		assert!(report.status_error.is_none());
	}

	let seen = seen.lock().clone();
	assert_eq!(seen.len(), 16);
	for n in 0..8 {
		let statuses: Vec<Status> = seen
			.iter()
			.filter(|(h, _)| *h == hash(n))
			.map(|(_, status)| *status)
			.collect();
		assert_eq!(statuses, vec![Status::Pending, Status::Confirmed]);

		let snapshot = dispatcher.tracked(&chain(), &hash(n)).await.unwrap().unwrap();
		assert_eq!(snapshot.status, Some(Status::Confirmed));
		assert_eq!(
			snapshot.history,
			vec![TransactionEventCode::TxPool, TransactionEventCode::TxConfirmed]
		);
	}
	dispatcher.shutdown().await;
}

#[tokio::test]
async fn test_reorg_reopens_confirmed_transaction() {
	let registry = Arc::new(SubscriptionRegistry::new());
	let (emitter, seen) = recording_emitter();
	registry
		.register(&Subscription::transaction(hash(1), chain()), emitter)
		.unwrap();
	let dispatcher = Dispatcher::new(&dispatch_config(2), &RateLimitConfig::default(), registry);

	let confirmed = TransactionBuilder::new().hash(&hash(1)).status(Status::Confirmed);
	dispatcher
		.dispatch(event(confirmed, TransactionEventCode::TxConfirmed))
		.await
		.unwrap();

	let late = TransactionBuilder::new().hash(&hash(1)).status(Status::Pending);
	let report = dispatcher
		.dispatch(event(late, TransactionEventCode::TxPool))
		.await
		.unwrap();
	assert!(report.status_error.is_some());

	let reorged = TransactionBuilder::new().hash(&hash(1)).status(Status::Pending);
	let report = dispatcher
		.dispatch(event(reorged, TransactionEventCode::TxPool).with_reorg(true))
		.await
		.unwrap();
	assert!(report.is_delivered());
	assert!(report.status_error.is_none());

	assert_eq!(
		seen.lock().iter().map(|(_, s)| *s).collect::<Vec<_>>(),
		vec![Status::Confirmed, Status::Pending]
	);
	dispatcher.shutdown().await;
}

#[tokio::test]
async fn test_global_filters_apply_before_account_filters() {
	let registry = Arc::new(SubscriptionRegistry::new());
	let (emitter, seen) = recording_emitter();
	registry
		.register(
			&Subscription::account(WATCHED, chain()).with_filters(vec![json!({ "value": { "gte": 10 } })]),
			emitter,
		)
		.unwrap();
	registry
		.set_global_filters(&chain(), vec![json!({ "status": "confirmed" })])
		.unwrap();
	let dispatcher = Dispatcher::new(&dispatch_config(2), &RateLimitConfig::default(), registry);

	let cases = [
		(1, Status::Pending, "50", false),
		(2, Status::Confirmed, "5", false),
		(3, Status::Confirmed, "50", true),
	];
	for (n, status, value, delivered) in cases {
		let builder = TransactionBuilder::new()
			.hash(&hash(n))
			.status(status)
			.from(WATCHED)
			.value(value);
		let report = dispatcher
			.dispatch(event(builder, status.default_event_code()))
			.await
			.unwrap();
		assert_eq!(report.is_delivered(), delivered, "case {}", n);
	}

	assert_eq!(seen.lock().clone(), vec![(hash(3), Status::Confirmed)]);
	dispatcher.shutdown().await;
}

#[tokio::test]
async fn test_account_and_transaction_subscriptions_both_receive() {
	let registry = Arc::new(SubscriptionRegistry::new());
	let (account_emitter, account_seen) = recording_emitter();
	let (tx_emitter, tx_seen) = recording_emitter();
	registry
		.register(&Subscription::account(WATCHED, chain()), account_emitter)
		.unwrap();
	registry
		.register(&Subscription::transaction(hash(9), chain()), tx_emitter)
		.unwrap();
	let dispatcher = Dispatcher::new(&dispatch_config(3), &RateLimitConfig::default(), registry);

	let builder = TransactionBuilder::new().hash(&hash(9)).to(WATCHED);
	let report = dispatcher
		.dispatch(event(builder, TransactionEventCode::TxPool))
		.await
		.unwrap();
	assert_eq!(report.matched, 2);
	assert_eq!(report.invoked, 2);
	assert_eq!(account_seen.lock().len(), 1);
	assert_eq!(tx_seen.lock().len(), 1);
	dispatcher.shutdown().await;
}

#[tokio::test]
async fn test_panicking_listener_does_not_stop_the_others() {
	let registry = Arc::new(SubscriptionRegistry::new());
	let emitter = Arc::new(Emitter::new());
	let calls = Arc::new(AtomicUsize::new(0));
	emitter.on(TransactionEventCode::TxPool, |_: &EmitterPayload| -> () {
		panic!("listener exploded");
	});
	let counter = calls.clone();
	emitter.on(TransactionEventCode::TxPool, move |_: &EmitterPayload| {
		counter.fetch_add(1, Ordering::SeqCst);
	});
	registry
		.register(&Subscription::transaction(hash(4), chain()), emitter)
		.unwrap();
	let dispatcher = Dispatcher::new(&dispatch_config(1), &RateLimitConfig::default(), registry);

	let report = dispatcher
		.dispatch(event(
			TransactionBuilder::new().hash(&hash(4)),
			TransactionEventCode::TxPool,
		))
		.await
		.unwrap();

	assert!(report.is_delivered());
	assert_eq!(report.invoked, 1);
	assert_eq!(calls.load(Ordering::SeqCst), 1);
	assert!(matches!(
		&report.failures[..],
		[ListenerFailure::Panicked { message, .. }] if message.contains("listener exploded")
	));
	dispatcher.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_block_policy_waits_for_refill() {
	let registry = Arc::new(SubscriptionRegistry::new());
	let (emitter, seen) = recording_emitter();
	registry
		.register(&Subscription::transaction(hash(5), chain()), emitter)
		.unwrap();
	let mut rate_limit = RateLimitConfig {
		policy: OverflowPolicy::Block,
		..RateLimitConfig::default()
	};
	rate_limit.rules.points = 1;
	rate_limit.rules.duration_ms = 1_000;
	let dispatcher = Dispatcher::new(&dispatch_config(1), &rate_limit, registry);

	let started = tokio::time::Instant::now();
	for status in [Status::Pending, Status::Confirmed] {
		let builder = TransactionBuilder::new().hash(&hash(5)).status(status);
		let report = dispatcher
			.dispatch(event(builder, status.default_event_code()))
			.await
			.unwrap();
		assert_eq!(report.outcome, DispatchOutcome::Delivered);
	}

	assert!(started.elapsed() >= Duration::from_millis(1_000));
	assert_eq!(seen.lock().len(), 2);
	dispatcher.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_terminal_transactions_are_pruned_after_grace() {
	let registry = Arc::new(SubscriptionRegistry::new());
	let (emitter, _) = recording_emitter();
	registry
		.register(&Subscription::transaction(hash(6), chain()), emitter)
		.unwrap();
	let config = DispatchConfig {
		workers: 1,
		terminal_grace_ms: 5_000,
		..DispatchConfig::default()
	};
	let dispatcher = Dispatcher::new(&config, &RateLimitConfig::default(), registry);

	let builder = TransactionBuilder::new().hash(&hash(6)).status(Status::Failed);
	dispatcher
		.dispatch(event(builder, TransactionEventCode::TxFailed))
		.await
		.unwrap();
	assert!(dispatcher.tracked(&chain(), &hash(6)).await.unwrap().is_some());

	tokio::time::sleep(Duration::from_millis(11_000)).await;
	assert!(dispatcher.tracked(&chain(), &hash(6)).await.unwrap().is_none());
	dispatcher.shutdown().await;
}
