//! Engine configuration loading and validation.
//!
//! The engine is configured from a JSON document such as:
//!
//! ```json
//! {
//!   "dapp_id": "...",
//!   "network_id": 1,
//!   "rate_limit": { "rules": { "points": 150, "duration_ms": 1000 } }
//! }
//! ```
//!
//! Environment variables prefixed with `ENGINE_` override file values.

use serde::{Deserialize, Serialize};
use std::{fs, path::Path, time::Duration};

use crate::models::{config::error::ConfigError, Blockchain, ConfigLoader, Network, System};

/// Default event server endpoint
pub const DEFAULT_API_URL: &str = "wss://api.blocknative.com/v0";

/// Admission budget: `points` tokens every `duration_ms`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitRules {
	pub points: u32,
	pub duration_ms: u64,
}

impl LimitRules {
	pub fn duration(&self) -> Duration {
		Duration::from_millis(self.duration_ms)
	}
}

impl Default for LimitRules {
	fn default() -> Self {
		Self {
			points: 150,
			duration_ms: 1000,
		}
	}
}

/// What happens to an emission once the bucket is empty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum OverflowPolicy {
	/// Reject the incoming emission and report it
	#[default]
	DropNewest,
	/// Queue the emission, evicting the oldest queued one when full
	DropOldest,
	/// Wait for the next refill
	Block,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
	pub rules: LimitRules,
	/// Tokens consumed per dispatch
	pub weight: u32,
	pub policy: OverflowPolicy,
	/// Bound of the backlog used by [`OverflowPolicy::DropOldest`]
	pub queue_capacity: usize,
}

impl Default for RateLimitConfig {
	fn default() -> Self {
		Self {
			rules: LimitRules::default(),
			weight: 1,
			policy: OverflowPolicy::default(),
			queue_capacity: 256,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
	/// Number of worker tasks draining inbound events
	pub workers: usize,
	/// Capacity of each worker's inbound channel
	pub channel_capacity: usize,
	/// How long a single listener may run before it is reported as stuck
	pub listener_timeout_ms: u64,
	/// How long terminal transactions are kept around for late reorgs
	pub terminal_grace_ms: u64,
}

impl DispatchConfig {
	pub fn listener_timeout(&self) -> Duration {
		Duration::from_millis(self.listener_timeout_ms)
	}

	pub fn terminal_grace(&self) -> Duration {
		Duration::from_millis(self.terminal_grace_ms)
	}
}

impl Default for DispatchConfig {
	fn default() -> Self {
		Self {
			workers: 4,
			channel_capacity: 1024,
			listener_timeout_ms: 5000,
			terminal_grace_ms: 60_000,
		}
	}
}

/// WebSocket transport settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WsSettings {
	pub heartbeat_interval_ms: u64,
	pub reconnect_timeout_ms: u64,
	pub max_reconnect_attempts: u32,
	pub connection_timeout_ms: u64,
}

impl Default for WsSettings {
	fn default() -> Self {
		Self {
			heartbeat_interval_ms: 30_000,
			reconnect_timeout_ms: 5_000,
			max_reconnect_attempts: 10,
			connection_timeout_ms: 10_000,
		}
	}
}

/// Complete engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
	/// Application key sent with every message; required unless `api_url`
	/// already carries the key
	#[serde(default)]
	pub dapp_id: Option<String>,
	#[serde(default)]
	pub api_url: Option<String>,
	pub network_id: u64,
	#[serde(default)]
	pub system: System,
	#[serde(default)]
	pub name: Option<String>,
	#[serde(default)]
	pub app_version: Option<String>,
	/// Timeout for request/response exchanges such as `simulate` and `config`
	#[serde(default = "default_request_timeout_ms")]
	pub request_timeout_ms: u64,
	#[serde(default)]
	pub rate_limit: RateLimitConfig,
	#[serde(default)]
	pub dispatch: DispatchConfig,
	#[serde(default)]
	pub ws: WsSettings,
}

fn default_request_timeout_ms() -> u64 {
	15_000
}

impl Default for EngineConfig {
	fn default() -> Self {
		Self {
			dapp_id: None,
			api_url: None,
			network_id: 1,
			system: System::Ethereum,
			name: None,
			app_version: None,
			request_timeout_ms: default_request_timeout_ms(),
			rate_limit: RateLimitConfig::default(),
			dispatch: DispatchConfig::default(),
			ws: WsSettings::default(),
		}
	}
}

impl EngineConfig {
	pub fn request_timeout(&self) -> Duration {
		Duration::from_millis(self.request_timeout_ms)
	}

	/// Endpoint the transport should connect to
	pub fn endpoint(&self) -> &str {
		self.api_url.as_deref().unwrap_or(DEFAULT_API_URL)
	}

	/// Resolves the configured network id, failing for ids without a known network.
	pub fn blockchain(&self) -> Result<Blockchain, ConfigError> {
		let network = match self.system {
			System::Bitcoin => match self.network_id {
				1 => Network::Main,
				_ => Network::Testnet,
			},
			System::Ethereum => Network::from_network_id(self.network_id).ok_or_else(|| {
				ConfigError::validation_error(format!(
					"Unsupported network id: {}",
					self.network_id
				))
			})?,
		};
		Ok(Blockchain::new(self.system, network))
	}

	/// Applies `ENGINE_*` environment variables on top of the loaded values.
	pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
		if let Ok(dapp_id) = std::env::var("ENGINE_DAPP_ID") {
			self.dapp_id = Some(dapp_id);
		}
		if let Ok(api_url) = std::env::var("ENGINE_API_URL") {
			self.api_url = Some(api_url);
		}
		if let Ok(network_id) = std::env::var("ENGINE_NETWORK_ID") {
			self.network_id = network_id.parse().map_err(|_| {
				ConfigError::env_error(format!("ENGINE_NETWORK_ID is not a number: {}", network_id))
			})?;
		}
		if let Ok(workers) = std::env::var("ENGINE_WORKERS") {
			self.dispatch.workers = workers.parse().map_err(|_| {
				ConfigError::env_error(format!("ENGINE_WORKERS is not a number: {}", workers))
			})?;
		}
		Ok(())
	}
}

impl ConfigLoader for EngineConfig {
	/// Load all engine configurations from a directory
	///
	/// Files that fail to parse or validate are skipped.
	fn load_all<T>(path: Option<&Path>) -> Result<T, ConfigError>
	where
		T: FromIterator<(String, Self)>,
	{
		let config_dir = path.unwrap_or(Path::new("config"));
		if !config_dir.exists() {
			return Err(ConfigError::file_error("config directory not found"));
		}

		let mut pairs = Vec::new();
		for entry in fs::read_dir(config_dir)? {
			let path = entry?.path();
			if !Self::is_json_file(&path) {
				continue;
			}

			let name = path
				.file_stem()
				.and_then(|s| s.to_str())
				.unwrap_or("unknown")
				.to_string();

			match Self::load_from_path(&path) {
				Ok(config) => pairs.push((name, config)),
				Err(e) => tracing::warn!(file = %path.display(), error = %e, "Skipping config"),
			}
		}

		Ok(T::from_iter(pairs))
	}

	/// Load an engine configuration from a specific file
	fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
		let file = fs::File::open(path)?;
		let config: EngineConfig = serde_json::from_reader(file)?;

		config.validate()?;

		Ok(config)
	}

	/// Validate the engine configuration
	fn validate(&self) -> Result<(), ConfigError> {
		let has_dapp_id = self.dapp_id.as_ref().is_some_and(|id| !id.is_empty());
		let has_api_url = self.api_url.as_ref().is_some_and(|url| !url.is_empty());
		if !has_dapp_id && !has_api_url {
			return Err(ConfigError::validation_error(
				"Either dapp_id or api_url is required",
			));
		}

		if let Some(api_url) = &self.api_url {
			let parsed = url::Url::parse(api_url)
				.map_err(|e| ConfigError::validation_error(format!("Invalid api_url: {}", e)))?;
			if !matches!(parsed.scheme(), "ws" | "wss") {
				return Err(ConfigError::validation_error(format!(
					"api_url must use ws or wss, got {}",
					parsed.scheme()
				)));
			}
		}

		self.blockchain()?;

		if self.rate_limit.rules.points == 0 {
			return Err(ConfigError::validation_error(
				"rate_limit.rules.points must be greater than zero",
			));
		}
		if self.rate_limit.rules.duration_ms == 0 {
			return Err(ConfigError::validation_error(
				"rate_limit.rules.duration_ms must be greater than zero",
			));
		}
		if self.rate_limit.weight == 0 || self.rate_limit.weight > self.rate_limit.rules.points {
			return Err(ConfigError::validation_error(format!(
				"rate_limit.weight must be between 1 and {}",
				self.rate_limit.rules.points
			)));
		}
		if self.rate_limit.policy == OverflowPolicy::DropOldest
			&& self.rate_limit.queue_capacity == 0
		{
			return Err(ConfigError::validation_error(
				"rate_limit.queue_capacity must be greater than zero for drop-oldest",
			));
		}
		if self.dispatch.workers == 0 {
			return Err(ConfigError::validation_error(
				"dispatch.workers must be greater than zero",
			));
		}
		if self.dispatch.channel_capacity == 0 {
			return Err(ConfigError::validation_error(
				"dispatch.channel_capacity must be greater than zero",
			));
		}

		Ok(())
	}
}
