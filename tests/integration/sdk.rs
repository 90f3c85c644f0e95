//! Integration tests for the engine facade over an in-memory transport.

use chain_event_engine::{
	models::{
		Blockchain, Config, EmitterPayload, EventObject, Network, OverflowPolicy,
		SimulationTransaction, Status, System, TransactionEventCode, TransactionEventLog,
	},
	sdk::Sdk,
	services::transport::{ConnectionState, Transport},
	utils::tests::builders::{config::EngineConfigBuilder, transaction::TransactionBuilder},
};
use serde_json::{json, Value};
use std::{sync::Arc, time::Duration};
use tokio::sync::mpsc;

use crate::integration::mocks::{FakeTransport, MockEventTransport};

const WATCHED: &str = "0x3333333333333333333333333333333333333333";

fn tx_hash(byte: &str) -> String {
	format!("0x{}", byte.repeat(32))
}

async fn engine_with(builder: EngineConfigBuilder) -> (Sdk, Arc<FakeTransport>) {
	let transport = FakeTransport::new();
	let sdk = Sdk::with_transport(builder.build(), transport.clone())
		.await
		.unwrap();
	(sdk, transport)
}

async fn engine() -> (Sdk, Arc<FakeTransport>) {
	engine_with(EngineConfigBuilder::new().request_timeout_ms(1_000)).await
}

/// Polls `check` until it holds or roughly a second has passed.
async fn eventually<F: Fn() -> bool>(check: F) -> bool {
	for _ in 0..100 {
		if check() {
			return true;
		}
		tokio::time::sleep(Duration::from_millis(10)).await;
	}
	check()
}

/// Replies to every `configs/put` with an acknowledgement echoing the config.
fn acknowledge_configs(transport: &FakeTransport) {
	transport.respond_with(|message| {
		if message.category_code != "configs" {
			return None;
		}
		Some(json!({
			"status": "ok",
			"event": {
				"eventCode": "put",
				"categoryCode": "configs",
				"config": message.payload.get("config").cloned().unwrap_or(Value::Null),
			}
		}))
	});
}

fn status_channel() -> (
	mpsc::UnboundedSender<(String, Status)>,
	mpsc::UnboundedReceiver<(String, Status)>,
) {
	mpsc::unbounded_channel()
}

async fn next(receiver: &mut mpsc::UnboundedReceiver<(String, Status)>) -> (String, Status) {
	tokio::time::timeout(Duration::from_secs(1), receiver.recv())
		.await
		.expect("no event delivered")
		.expect("listener dropped")
}

#[tokio::test]
async fn test_initialize_is_sent_and_stamped() {
	let (sdk, transport) = engine().await;

	let initialize = transport.sent_matching("initialize", "checkDappId");
	assert_eq!(initialize.len(), 1);
	assert_eq!(initialize[0].dapp_id.as_deref(), Some("test-dapp"));
	assert_eq!(initialize[0].version.as_deref(), Some(env!("CARGO_PKG_VERSION")));
	assert_eq!(
		initialize[0].blockchain,
		Some(Blockchain::new(System::Ethereum, Network::Main))
	);

	transport
		.push(json!({ "status": "ok", "connectionId": "conn-42" }))
		.await;
	assert!(eventually(|| sdk.connection_id().as_deref() == Some("conn-42")).await);
	sdk.destroy().await;
}

#[tokio::test]
async fn test_missing_inbound_stream_is_rejected() {
	let mut transport = MockEventTransport::new();
	transport.expect_inbound().times(1).returning(|| None);
	transport.expect_send().never();

	let result = Sdk::with_transport(EngineConfigBuilder::new().build(), Arc::new(transport)).await;
	assert!(result.is_err());
}

#[tokio::test]
async fn test_transaction_watch_and_server_events() {
	let (sdk, transport) = engine().await;
	let hash = tx_hash("ab");

	let (log, emitter) = sdk.transaction(&hash, Some("my-tx")).await.unwrap();
	match log {
		TransactionEventLog::Ethereum(log) => {
			assert_eq!(log.id, "my-tx");
			assert_eq!(log.hash, hash);
			assert_eq!(log.status, "pending");
			assert_eq!(log.event_code, "txSent");
			assert!(log.start_time.is_some());
		}
		other => panic!("unexpected log {:?}", other),
	}

	let watch = transport.sent_matching("activeTransaction", "watch");
	assert_eq!(watch.len(), 1);
	assert_eq!(watch[0].payload["transaction"]["hash"], json!(hash));
	assert_eq!(watch[0].payload["transaction"]["id"], json!("my-tx"));

	let (sender, mut received) = status_channel();
	emitter.on(TransactionEventCode::All, move |payload: &EmitterPayload| {
		if let Some(tx) = payload.as_transaction() {
			let _ = sender.send((tx.hash().to_string(), tx.status()));
		}
	});

	for (status, code) in [
		(Status::Pending, TransactionEventCode::TxPool),
		(Status::Confirmed, TransactionEventCode::TxConfirmed),
	] {
		let message = TransactionBuilder::new()
			.hash(&hash)
			.status(status)
			.into_message(code);
		transport.push(serde_json::to_value(&message).unwrap()).await;
	}

	assert_eq!(next(&mut received).await, (hash.clone(), Status::Pending));
	assert_eq!(next(&mut received).await, (hash.clone(), Status::Confirmed));
	sdk.destroy().await;
}

#[tokio::test]
async fn test_watching_twice_shares_the_emitter() {
	let (sdk, transport) = engine().await;
	let hash = tx_hash("cd");

	let (_, first) = sdk.transaction(&hash, None).await.unwrap();
	let (_, second) = sdk.transaction(&hash.to_uppercase().replace("0X", "0x"), None).await.unwrap();
	assert!(Arc::ptr_eq(&first, &second));
	assert_eq!(sdk.registry().subscriptions().len(), 1);
	assert_eq!(transport.sent_matching("activeTransaction", "watch").len(), 2);
	sdk.destroy().await;
}

#[tokio::test]
async fn test_invalid_hash_and_address_are_rejected() {
	let (sdk, transport) = engine().await;

	assert!(sdk.transaction("0x1234", None).await.is_err());
	assert!(sdk.account("not-an-address").await.is_err());
	assert_eq!(transport.sent().len(), 1);
	assert!(sdk.registry().is_empty());
	sdk.destroy().await;
}

#[tokio::test]
async fn test_config_filters_gate_account_events() {
	let (sdk, transport) = engine().await;
	acknowledge_configs(&transport);

	let response = sdk
		.config(Config {
			scope: WATCHED.to_string(),
			filters: Some(vec![json!({ "value": { "gte": 1000 } })]),
			abi: None,
			watch_address: Some(true),
		})
		.await
		.unwrap();
	let emitter = response.emitter.expect("watched scope has an emitter");
	assert_eq!(transport.sent_matching("configs", "put").len(), 1);

	let (sender, mut received) = status_channel();
	emitter.on(TransactionEventCode::TxPool, move |payload: &EmitterPayload| {
		if let Some(tx) = payload.as_transaction() {
			let _ = sender.send((tx.hash().to_string(), tx.status()));
		}
	});

	for (byte, value) in [("01", "500"), ("02", "1500")] {
		let message = TransactionBuilder::new()
			.hash(&tx_hash(byte))
			.from(WATCHED)
			.value(value)
			.into_message(TransactionEventCode::TxPool);
		transport.push(serde_json::to_value(&message).unwrap()).await;
	}

	assert_eq!(next(&mut received).await, (tx_hash("02"), Status::Pending));
	sdk.destroy().await;
}

#[tokio::test]
async fn test_invalid_config_filter_is_not_sent() {
	let (sdk, transport) = engine().await;

	let result = sdk
		.config(Config {
			scope: WATCHED.to_string(),
			filters: Some(vec![json!({ "_join": "XOR", "terms": [] })]),
			..Config::default()
		})
		.await;
	assert!(result.is_err());
	assert!(transport.sent_matching("configs", "put").is_empty());
	sdk.destroy().await;
}

#[tokio::test]
async fn test_config_rejected_by_server() {
	let (sdk, transport) = engine().await;
	transport.respond_with(|message| {
		(message.category_code == "configs").then(|| {
			json!({
				"status": "error",
				"reason": "scope is not allowed",
				"event": {
					"eventCode": "put",
					"categoryCode": "configs",
					"config": message.payload["config"].clone(),
				}
			})
		})
	});

	let error = sdk
		.config(Config {
			scope: WATCHED.to_string(),
			filters: Some(vec![json!({ "status": "confirmed" })]),
			..Config::default()
		})
		.await
		.unwrap_err();
	assert_eq!(error.message, "scope is not allowed");
	assert_eq!(error.account.as_deref(), Some(WATCHED));
	assert!(!sdk.registry().is_watching_account(&sdk.blockchain().chain_id(), WATCHED));
	sdk.destroy().await;
}

#[tokio::test]
async fn test_concurrent_configs_for_one_scope_get_their_own_answers() {
	let (sdk, transport) = engine().await;
	transport.respond_with(|message| {
		if message.category_code != "configs" {
			return None;
		}
		let config = message.payload["config"].clone();
		let rejected = config["filters"][0]["status"] == json!("pending");
		Some(json!({
			"status": if rejected { "error" } else { "ok" },
			"reason": if rejected { "pending filters are not allowed" } else { "" },
			"event": { "eventCode": "put", "categoryCode": "configs", "config": config }
		}))
	});

	let config = |status: &str| Config {
		scope: WATCHED.to_string(),
		filters: Some(vec![json!({ "status": status })]),
		..Config::default()
	};
	let (rejected, accepted) =
		tokio::join!(sdk.config(config("pending")), sdk.config(config("confirmed")));

	assert_eq!(rejected.unwrap_err().message, "pending filters are not allowed");
	let accepted = accepted.unwrap();
	assert_eq!(
		accepted.config.filters,
		Some(vec![json!({ "status": "confirmed" })])
	);
	assert_eq!(transport.sent_matching("configs", "put").len(), 2);
	sdk.destroy().await;
}

#[tokio::test(start_paused = true)]
async fn test_config_without_response_times_out() {
	let (sdk, _transport) =
		engine_with(EngineConfigBuilder::new().request_timeout_ms(2_000)).await;

	let error = sdk
		.config(Config {
			scope: "global".to_string(),
			filters: Some(vec![json!({ "status": "confirmed" })]),
			..Config::default()
		})
		.await
		.unwrap_err();
	assert_eq!(error.message, "Configuration request timed out");
	sdk.destroy().await;
}

#[tokio::test]
async fn test_subscriptions_are_replayed_after_reconnect() {
	let (sdk, transport) = engine().await;
	acknowledge_configs(&transport);
	let hash = tx_hash("ef");

	sdk.transaction(&hash, Some("replayed-id")).await.unwrap();
	sdk.account(WATCHED).await.unwrap();
	sdk.config(Config {
		scope: "global".to_string(),
		filters: Some(vec![json!({ "status": "confirmed" })]),
		..Config::default()
	})
	.await
	.unwrap();

	transport.clear_sent();
	transport.set_state(ConnectionState::Down);
	tokio::time::sleep(Duration::from_millis(20)).await;
	transport.set_state(ConnectionState::Reopened);

	assert!(eventually(|| transport.sent_matching("configs", "put").len() == 1).await);
	assert_eq!(transport.sent_matching("initialize", "checkDappId").len(), 1);

	let transactions = transport.sent_matching("activeTransaction", "watch");
	assert_eq!(transactions.len(), 1);
	assert_eq!(transactions[0].payload["transaction"]["id"], json!("replayed-id"));

	let accounts = transport.sent_matching("accountAddress", "watch");
	assert_eq!(accounts.len(), 1);
	assert_eq!(accounts[0].payload["account"]["address"], json!(WATCHED));
	sdk.destroy().await;
}

#[tokio::test]
async fn test_connection_loss_reaches_error_hooks() {
	let (sdk, transport) = engine().await;
	let (sender, mut errors) = mpsc::unbounded_channel();
	sdk.on_error(move |error| {
		let _ = sender.send(error.message.clone());
	});

	transport.set_state(ConnectionState::Down);
	let message = tokio::time::timeout(Duration::from_secs(1), errors.recv())
		.await
		.unwrap()
		.unwrap();
	assert_eq!(message, "Connection lost");

	transport
		.push(json!({ "status": "error", "reason": "invalid api key" }))
		.await;
	let message = tokio::time::timeout(Duration::from_secs(1), errors.recv())
		.await
		.unwrap()
		.unwrap();
	assert_eq!(message, "invalid api key");
	sdk.destroy().await;
}

#[tokio::test]
async fn test_rate_limited_events_are_reported() {
	let (sdk, transport) = engine_with(
		EngineConfigBuilder::new()
			.rate_limit(1, 60_000)
			.policy(OverflowPolicy::DropNewest),
	)
	.await;
	let (sender, mut errors) = mpsc::unbounded_channel();
	sdk.on_error(move |error| {
		let _ = sender.send((error.message.clone(), error.transaction.clone()));
	});

	let hash = tx_hash("99");
	sdk.transaction(&hash, None).await.unwrap();
	for (status, code) in [
		(Status::Pending, TransactionEventCode::TxPool),
		(Status::Confirmed, TransactionEventCode::TxConfirmed),
	] {
		let message = TransactionBuilder::new()
			.hash(&hash)
			.status(status)
			.into_message(code);
		transport.push(serde_json::to_value(&message).unwrap()).await;
	}

	let (message, transaction) = tokio::time::timeout(Duration::from_secs(1), errors.recv())
		.await
		.unwrap()
		.unwrap();
	assert_eq!(message, "Rate limited");
	assert_eq!(transaction.as_deref(), Some(hash.as_str()));
	sdk.destroy().await;
}

#[tokio::test]
async fn test_caller_events_are_emitted_locally() {
	let (sdk, transport) = engine().await;
	let hash = tx_hash("12");
	let (_, emitter) = sdk.transaction(&hash, Some("local")).await.unwrap();

	let (sender, mut received) = mpsc::unbounded_channel();
	emitter.on(TransactionEventCode::TxSent, move |payload: &EmitterPayload| {
		if let EmitterPayload::Log(log) = payload {
			let _ = sender.send(log.id().to_string());
		}
	});

	let event: EventObject = serde_json::from_value(json!({
		"eventCode": "txSent",
		"categoryCode": "activeTransaction",
		"transaction": { "hash": hash, "status": "pending", "id": "local" }
	}))
	.unwrap();
	sdk.event(event).await.unwrap();

	assert_eq!(received.recv().await.as_deref(), Some("local"));
	let sent = transport.sent_matching("activeTransaction", "txSent");
	assert_eq!(sent.len(), 1);
	assert_eq!(sent[0].payload["transaction"]["hash"], json!(hash));
	sdk.destroy().await;
}

#[tokio::test]
async fn test_stuck_local_listener_times_out() {
	let (sdk, transport) = engine_with(
		EngineConfigBuilder::new()
			.request_timeout_ms(1_000)
			.listener_timeout_ms(50),
	)
	.await;
	let (sender, mut errors) = mpsc::unbounded_channel();
	sdk.on_error(move |error| {
		let _ = sender.send((error.message.clone(), error.transaction.clone()));
	});

	let hash = tx_hash("13");
	let (_, emitter) = sdk.transaction(&hash, None).await.unwrap();
	emitter.on(TransactionEventCode::TxSent, |_: &EmitterPayload| {
		std::thread::sleep(Duration::from_millis(500));
	});

	let event: EventObject = serde_json::from_value(json!({
		"eventCode": "txSent",
		"categoryCode": "activeTransaction",
		"transaction": { "hash": hash, "status": "pending" }
	}))
	.unwrap();
	tokio::time::timeout(Duration::from_millis(300), sdk.event(event))
		.await
		.expect("event blocked on a stuck listener")
		.unwrap();

	let (message, transaction) = tokio::time::timeout(Duration::from_secs(1), errors.recv())
		.await
		.unwrap()
		.unwrap();
	assert_eq!(message, "Listener failed");
	assert_eq!(transaction.as_deref(), Some(hash.as_str()));
	assert_eq!(transport.sent_matching("activeTransaction", "txSent").len(), 1);
	sdk.destroy().await;
}

#[tokio::test]
async fn test_unsubscribe_sends_unwatch() {
	let (sdk, transport) = engine().await;
	let hash = tx_hash("34");

	sdk.transaction(&hash, None).await.unwrap();
	sdk.account(WATCHED).await.unwrap();

	sdk.unsubscribe(&hash).await.unwrap();
	sdk.unsubscribe(WATCHED).await.unwrap();
	assert_eq!(transport.sent_matching("activeTransaction", "unwatch").len(), 1);
	assert_eq!(transport.sent_matching("accountAddress", "unwatch").len(), 1);
	assert!(sdk.registry().is_empty());

	assert!(sdk.unsubscribe(&hash).await.is_err());
	sdk.destroy().await;
}

#[tokio::test]
async fn test_simulation_round_trip() {
	let (sdk, transport) = engine().await;
	transport.respond_with(|message| {
		if message.category_code != "simulate" {
			return None;
		}
		let transaction = &message.payload["transaction"];
		let gas = transaction["gas"].as_u64().unwrap_or_default();
		Some(json!({
			"status": "ok",
			"event": {
				"eventCode": "txSimulation",
				"categoryCode": "simulate",
				"eventId": message.payload["eventId"].clone(),
				"transaction": {
					"from": transaction["from"].clone(),
					"to": transaction["to"].clone(),
					"gas": gas,
					"gasUsed": gas / 2,
					"status": "simulated",
					"system": "ethereum",
					"network": "main",
					"simulatedBlockNumber": 42
				}
			}
		}))
	});

	let transaction = SimulationTransaction {
		from: WATCHED.to_string(),
		to: "0x4444444444444444444444444444444444444444".to_string(),
		gas: 30_000,
		..SimulationTransaction::default()
	};

	let output = sdk
		.simulate(System::Ethereum, Network::Main, transaction.clone())
		.await
		.unwrap();
	assert_eq!(output.gas_used, 15_000);
	assert_eq!(output.simulated_block_number, 42);

	let batch = sdk
		.multi_simulate(
			System::Ethereum,
			Network::Main,
			vec![transaction.clone(), SimulationTransaction { gas: 50_000, ..transaction }],
		)
		.await
		.unwrap();
	assert_eq!(batch.gas_used, vec![15_000, 25_000]);
	assert_eq!(batch.status, Status::Simulated);
	sdk.destroy().await;
}

#[tokio::test]
async fn test_destroy_stops_everything() {
	let (sdk, transport) = engine().await;
	sdk.transaction(&tx_hash("56"), None).await.unwrap();

	sdk.destroy().await;
	sdk.destroy().await;

	assert!(sdk.registry().is_empty());
	assert_eq!(
		*transport.state().borrow(),
		ConnectionState::Closed
	);
	assert!(sdk.transaction(&tx_hash("78"), None).await.is_err());
	assert!(sdk.account(WATCHED).await.is_err());
}
