//! Tracing subscriber setup.
//!
//! Log output is filtered through `RUST_LOG`; when it is unset the level
//! passed by the caller (or `info`) applies.

use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

/// Default directive used when `RUST_LOG` is not set
pub const DEFAULT_LOG_LEVEL: &str = "info";

type SetupError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Installs the global subscriber writing to stdout.
pub fn setup_logging(level: Option<&str>) -> Result<(), SetupError> {
	setup_logging_with_writer(level, std::io::stdout)
}

/// Installs the global subscriber writing to `writer`.
///
/// Fails if a global subscriber is already installed.
pub fn setup_logging_with_writer<W>(level: Option<&str>, writer: W) -> Result<(), SetupError>
where
	W: for<'writer> fmt::MakeWriter<'writer> + Send + Sync + 'static,
{
	let filter = EnvFilter::try_from_default_env()
		.or_else(|_| EnvFilter::try_new(level.unwrap_or(DEFAULT_LOG_LEVEL)))?;

	tracing_subscriber::registry()
		.with(filter)
		.with(
			fmt::layer().with_writer(writer).event_format(
				fmt::format()
					.with_level(true)
					.with_target(true)
					.with_thread_ids(false)
					.with_ansi(false)
					.compact(),
			),
		)
		.try_init()?;
	Ok(())
}
