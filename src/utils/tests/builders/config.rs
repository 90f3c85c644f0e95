//! Test helper utilities for engine configuration
//!
//! - `EngineConfigBuilder`: Builder for creating test EngineConfig instances

use crate::models::{EngineConfig, OverflowPolicy, System};

/// Builder for creating test EngineConfig instances
pub struct EngineConfigBuilder {
	config: EngineConfig,
}

impl Default for EngineConfigBuilder {
	fn default() -> Self {
		Self {
			config: EngineConfig {
				dapp_id: Some("test-dapp".to_string()),
				..EngineConfig::default()
			},
		}
	}
}

impl EngineConfigBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn dapp_id(mut self, dapp_id: &str) -> Self {
		self.config.dapp_id = Some(dapp_id.to_string());
		self
	}

	pub fn api_url(mut self, url: &str) -> Self {
		self.config.api_url = Some(url.to_string());
		self
	}

	pub fn network_id(mut self, network_id: u64) -> Self {
		self.config.network_id = network_id;
		self
	}

	pub fn system(mut self, system: System) -> Self {
		self.config.system = system;
		self
	}

	pub fn rate_limit(mut self, points: u32, duration_ms: u64) -> Self {
		self.config.rate_limit.rules.points = points;
		self.config.rate_limit.rules.duration_ms = duration_ms;
		self
	}

	pub fn policy(mut self, policy: OverflowPolicy) -> Self {
		self.config.rate_limit.policy = policy;
		self
	}

	pub fn queue_capacity(mut self, capacity: usize) -> Self {
		self.config.rate_limit.queue_capacity = capacity;
		self
	}

	pub fn workers(mut self, workers: usize) -> Self {
		self.config.dispatch.workers = workers;
		self
	}

	pub fn listener_timeout_ms(mut self, timeout_ms: u64) -> Self {
		self.config.dispatch.listener_timeout_ms = timeout_ms;
		self
	}

	pub fn terminal_grace_ms(mut self, grace_ms: u64) -> Self {
		self.config.dispatch.terminal_grace_ms = grace_ms;
		self
	}

	pub fn request_timeout_ms(mut self, timeout_ms: u64) -> Self {
		self.config.request_timeout_ms = timeout_ms;
		self
	}

	pub fn build(self) -> EngineConfig {
		self.config
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::models::ConfigLoader;

	#[test]
	fn test_default_builder_is_valid() {
		let config = EngineConfigBuilder::new().build();
		assert!(config.validate().is_ok());
		assert_eq!(config.dapp_id.as_deref(), Some("test-dapp"));
	}

	#[test]
	fn test_builder_overrides() {
		let config = EngineConfigBuilder::new()
			.network_id(5)
			.rate_limit(10, 500)
			.policy(OverflowPolicy::Block)
			.workers(2)
			.build();
		assert_eq!(config.network_id, 5);
		assert_eq!(config.rate_limit.rules.points, 10);
		assert_eq!(config.rate_limit.rules.duration_ms, 500);
		assert_eq!(config.rate_limit.policy, OverflowPolicy::Block);
		assert_eq!(config.dispatch.workers, 2);
	}
}
