//! Isolated listener invocation.
//!
//! Every listener runs on the blocking pool so a panic or a listener that
//! never returns cannot stall the worker that owns the event's key. A
//! listener still running when its timeout fires is left to finish on its
//! own; its result is discarded.

use std::{any::Any, sync::Arc, time::Duration};
use tokio::{task, time::timeout};

use crate::{
	models::{EmitterPayload, EmitterResult, TransactionEventCode},
	services::{dispatch::error::ListenerFailure, registry::Emitter},
};

/// Results of the listeners of one emitter
#[derive(Debug, Default)]
pub struct Invocation {
	pub results: Vec<EmitterResult>,
	pub failures: Vec<ListenerFailure>,
}

/// Runs every listener `emitter` has for `code`, in registration order.
pub async fn invoke_listeners(
	emitter: &Emitter,
	code: &TransactionEventCode,
	payload: Arc<EmitterPayload>,
	listener_timeout: Duration,
) -> Invocation {
	let mut invocation = Invocation::default();

	for (index, listener) in emitter.listeners_for(code).into_iter().enumerate() {
		let payload = payload.clone();
		let handle = task::spawn_blocking(move || listener(&payload));

		match timeout(listener_timeout, handle).await {
			Ok(Ok(result)) => invocation.results.push(result),
			Ok(Err(join_error)) => {
				let message = if join_error.is_panic() {
					panic_message(join_error.into_panic())
				} else {
					join_error.to_string()
				};
				tracing::warn!(emitter = emitter.id(), index, event_code = %code, message = %message, "listener panicked");
				invocation.failures.push(ListenerFailure::Panicked {
					emitter: emitter.id(),
					index,
					message,
				});
			}
			Err(_) => {
				tracing::warn!(
					emitter = emitter.id(),
					index,
					event_code = %code,
					timeout_ms = listener_timeout.as_millis() as u64,
					"listener timed out"
				);
				invocation.failures.push(ListenerFailure::TimedOut {
					emitter: emitter.id(),
					index,
					timeout: listener_timeout,
				});
			}
		}
	}

	invocation
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
	if let Some(message) = payload.downcast_ref::<&str>() {
		message.to_string()
	} else if let Some(message) = payload.downcast_ref::<String>() {
		message.clone()
	} else {
		"unknown panic".to_string()
	}
}
