//! Domain models and data structures for transaction and account monitoring.
//!
//! - `config`: Engine configuration loading and validation
//! - `core`: Chain identifiers, transaction payloads, events, subscriptions,
//!   notifications and simulation results

mod config;
mod core;

pub use config::{
	ConfigError, ConfigLoader, DispatchConfig, EngineConfig, LimitRules, OverflowPolicy,
	RateLimitConfig, WsSettings,
};

pub use self::core::*;
