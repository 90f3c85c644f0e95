//! Configuration loading and validation.
//!
//! Engine settings are read from JSON files through the [`ConfigLoader`]
//! trait and validated before use.

use std::path::Path;

mod engine_config;
mod error;

pub use engine_config::{
	DispatchConfig, EngineConfig, LimitRules, OverflowPolicy, RateLimitConfig, WsSettings,
};
pub use error::ConfigError;

/// Common interface for loading configuration files
pub trait ConfigLoader: Sized {
	/// Load every configuration file found in a directory
	fn load_all<T>(path: Option<&Path>) -> Result<T, ConfigError>
	where
		T: FromIterator<(String, Self)>;

	/// Load a configuration from a single file
	fn load_from_path(path: &Path) -> Result<Self, ConfigError>;

	/// Validate the loaded configuration
	fn validate(&self) -> Result<(), ConfigError>;

	fn is_json_file(path: &Path) -> bool {
		path.extension()
			.map(|ext| ext.to_string_lossy().to_lowercase() == "json")
			.unwrap_or(false)
	}
}
