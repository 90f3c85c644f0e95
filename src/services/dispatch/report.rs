//! Dispatch outcomes and listener result reconciliation.

use crate::{
	models::{ChainId, EmitterResult, NotificationDecision, NotificationObject, Status, TransactionEventCode},
	services::{
		dispatch::error::ListenerFailure, limiter::RateLimitError, status::StatusError,
		status::Transition,
	},
};

#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
	/// Listeners of at least one subscription ran
	Delivered,
	/// No subscription matched the event
	NoMatch,
	/// The emission was dropped by the rate limiter
	RateLimited(RateLimitError),
}

/// What happened to one inbound event
#[derive(Debug, Clone)]
pub struct DispatchReport {
	pub chain_id: ChainId,
	pub hash: String,
	pub event_code: TransactionEventCode,
	pub outcome: DispatchOutcome,
	/// Subscriptions that matched after filtering
	pub matched: usize,
	/// Listeners that returned normally
	pub invoked: usize,
	pub failures: Vec<ListenerFailure>,
	pub decision: Option<NotificationDecision>,
	pub transition: Option<Transition>,
	/// Set when the tracked transaction rejected the event's status
	pub status_error: Option<StatusError>,
}

impl DispatchReport {
	pub fn new(chain_id: ChainId, hash: impl Into<String>, event_code: TransactionEventCode) -> Self {
		Self {
			chain_id,
			hash: hash.into(),
			event_code,
			outcome: DispatchOutcome::NoMatch,
			matched: 0,
			invoked: 0,
			failures: Vec::new(),
			decision: None,
			transition: None,
			status_error: None,
		}
	}

	pub fn is_delivered(&self) -> bool {
		self.outcome == DispatchOutcome::Delivered
	}

	pub fn is_rate_limited(&self) -> bool {
		matches!(self.outcome, DispatchOutcome::RateLimited(_))
	}
}

/// Folds listener results into the value handed to transaction handlers and
/// the notification decision.
///
/// A single suppression wins over everything; otherwise the last override
/// wins; otherwise the default notification for `status` applies.
pub fn fold_results(
	results: &[EmitterResult],
	status: Status,
	event_code: &TransactionEventCode,
) -> (EmitterResult, NotificationDecision) {
	if results.iter().any(|result| *result == EmitterResult::Suppress) {
		return (EmitterResult::Suppress, NotificationDecision::Suppressed);
	}

	let last_override = results.iter().rev().find_map(|result| match result {
		EmitterResult::Override(notification) => Some(notification),
		_ => None,
	});
	match last_override {
		Some(notification) => (
			EmitterResult::Override(notification.clone()),
			NotificationDecision::Overridden(notification.clone()),
		),
		None => (
			EmitterResult::NoOp,
			NotificationDecision::Default(NotificationObject::for_status(
				status,
				event_code.as_str(),
			)),
		),
	}
}
