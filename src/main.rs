//! Command line watcher built on the engine.
//!
//! Connects to the event server, watches the transaction hashes and account
//! addresses given on the command line and logs every delivered event until
//! interrupted with Ctrl+C.
//!
//! # Flow
//! 1. Loads `.env` and the engine configuration (file, then `ENGINE_*` overrides)
//! 2. Connects the engine and registers the requested subscriptions
//! 3. Logs events and reported errors
//! 4. Destroys the engine on Ctrl+C

use chain_event_engine::{
	models::{ConfigLoader, EmitterPayload, EngineConfig, SdkError, TransactionEventCode},
	sdk::Sdk,
	services::registry::Emitter,
	utils::logging::setup_logging,
};

use anyhow::Context;
use clap::{Arg, ArgAction, Command};
use dotenvy::dotenv;
use std::{path::Path, sync::Arc};
use tracing::{error, info};

const DEFAULT_CONFIG_PATH: &str = "config/engine.json";

fn load_config(path: Option<&str>) -> anyhow::Result<EngineConfig> {
	let mut config = match path {
		Some(path) => EngineConfig::load_from_path(Path::new(path))
			.with_context(|| format!("failed to load configuration from {}", path))?,
		None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
			EngineConfig::load_from_path(Path::new(DEFAULT_CONFIG_PATH))
				.context("failed to load default configuration")?
		}
		None => EngineConfig::default(),
	};
	config.apply_env_overrides()?;
	config.validate()?;
	Ok(config)
}

/// Logs every event an emitter delivers under `label`.
fn log_events(label: String, emitter: &Arc<Emitter>) {
	emitter.on(TransactionEventCode::All, move |payload: &EmitterPayload| {
		match payload {
			EmitterPayload::Transaction(tx) => info!(
				subscription = %label,
				hash = %tx.hash(),
				status = %tx.status(),
				event_code = %tx.common().event_code,
				"event"
			),
			EmitterPayload::Log(log) => info!(subscription = %label, id = %log.id(), "local event"),
		}
	});
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	dotenv().ok();

	let matches = Command::new("chain-event-engine")
		.version(env!("CARGO_PKG_VERSION"))
		.about("Watches blockchain transactions and accounts through an event server.")
		.arg(
			Arg::new("config")
				.long("config")
				.help("Path to the engine configuration file (default: config/engine.json)")
				.value_name("PATH"),
		)
		.arg(
			Arg::new("log-level")
				.long("log-level")
				.help("Set log level (trace, debug, info, warn, error)")
				.value_name("LEVEL"),
		)
		.arg(
			Arg::new("transaction")
				.long("transaction")
				.short('t')
				.help("Transaction hash to watch; may be repeated")
				.value_name("HASH")
				.action(ArgAction::Append),
		)
		.arg(
			Arg::new("account")
				.long("account")
				.short('a')
				.help("Account address to watch; may be repeated")
				.value_name("ADDRESS")
				.action(ArgAction::Append),
		)
		.get_matches();

	let level = matches.get_one::<String>("log-level").map(String::as_str);
	setup_logging(level).map_err(|e| anyhow::anyhow!("failed to set up logging: {}", e))?;

	let config = load_config(matches.get_one::<String>("config").map(String::as_str))?;
	let sdk = Sdk::connect(config).await?;
	sdk.on_error(|e: &SdkError| error!(error = %e, "engine error"));

	for hash in matches.get_many::<String>("transaction").into_iter().flatten() {
		let (_, emitter) = sdk.transaction(hash, None).await?;
		log_events(hash.clone(), &emitter);
	}
	for address in matches.get_many::<String>("account").into_iter().flatten() {
		let (details, emitter) = sdk.account(address).await?;
		log_events(details.address, &emitter);
	}

	info!(
		subscriptions = sdk.registry().subscriptions().len(),
		"watching, press Ctrl+C to stop"
	);
	tokio::signal::ctrl_c().await?;

	info!("shutting down");
	sdk.destroy().await;
	Ok(())
}
