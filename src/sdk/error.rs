//! Conversions of engine errors into the caller-facing [`SdkError`].

use crate::{
	models::{ConfigError, SdkError},
	services::{
		dispatch::{DispatchError, DispatchReport, DispatchOutcome},
		filter::FilterError,
		registry::RegistryError,
		simulation::SimulationError,
		transport::TransportError,
	},
};

impl From<TransportError> for SdkError {
	fn from(error: TransportError) -> Self {
		SdkError::new("Connection error").with_error(error)
	}
}

impl From<RegistryError> for SdkError {
	fn from(error: RegistryError) -> Self {
		SdkError::new("Subscription error").with_error(error)
	}
}

impl From<FilterError> for SdkError {
	fn from(error: FilterError) -> Self {
		SdkError::new("Invalid filter").with_error(error)
	}
}

impl From<SimulationError> for SdkError {
	fn from(error: SimulationError) -> Self {
		SdkError::new("Simulation failed").with_error(error)
	}
}

impl From<DispatchError> for SdkError {
	fn from(error: DispatchError) -> Self {
		SdkError::new("Dispatch failed").with_error(error)
	}
}

impl From<ConfigError> for SdkError {
	fn from(error: ConfigError) -> Self {
		SdkError::new("Invalid configuration").with_error(error)
	}
}

/// Conditions in a dispatch report worth telling the caller about.
pub fn report_errors(report: &DispatchReport) -> Vec<SdkError> {
	let mut errors = Vec::new();
	if let DispatchOutcome::RateLimited(error) = &report.outcome {
		errors.push(
			SdkError::new("Rate limited")
				.with_error(error)
				.for_transaction(&report.hash),
		);
	}
	if let Some(error) = &report.status_error {
		errors.push(
			SdkError::new("Invalid status transition")
				.with_error(error)
				.for_transaction(&report.hash),
		);
	}
	errors.extend(report.failures.iter().map(|failure| {
		SdkError::new("Listener failed")
			.with_error(failure)
			.for_transaction(&report.hash)
	}));
	errors
}
