//! Notification and listener outcome models.

use serde::{Deserialize, Serialize};

use crate::models::{EmitterPayload, Status, TransactionData};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
	Pending,
	Success,
	Error,
	Hint,
}

/// Notification a UI layer would render for a transaction event
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationObject {
	#[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
	pub kind: Option<NotificationType>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
	/// Milliseconds before the notification dismisses itself
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub auto_dismiss: Option<u64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub event_code: Option<String>,
}

impl NotificationObject {
	/// Default notification for a transaction reaching `status`.
	pub fn for_status(status: Status, event_code: &str) -> Self {
		let (kind, message, auto_dismiss) = match status {
			Status::PendingSimulation | Status::Pending => (
				NotificationType::Pending,
				"Your transaction is pending, view progress.",
				None,
			),
			Status::Confirmed => (
				NotificationType::Success,
				"Your transaction has succeeded",
				Some(4000),
			),
			Status::Speedup => (
				NotificationType::Pending,
				"Your transaction has been sped up",
				None,
			),
			Status::Cancel => (
				NotificationType::Pending,
				"Your transaction is being canceled",
				None,
			),
			Status::Stuck => (
				NotificationType::Hint,
				"Your transaction is stuck, consider speeding it up",
				None,
			),
			Status::Failed => (NotificationType::Error, "Your transaction has failed", None),
			Status::Dropped => (
				NotificationType::Error,
				"Your transaction was dropped from the mempool",
				None,
			),
			Status::Simulated => (
				NotificationType::Hint,
				"Your transaction was simulated",
				Some(4000),
			),
		};
		Self {
			kind: Some(kind),
			message: Some(message.to_string()),
			auto_dismiss,
			event_code: Some(event_code.to_string()),
		}
	}
}

/// Value a listener hands back to the engine
#[derive(Debug, Clone, PartialEq, Default)]
pub enum EmitterResult {
	/// Keep the default notification
	#[default]
	NoOp,
	/// Do not show any notification for this event
	Suppress,
	/// Replace the default notification
	Override(NotificationObject),
}

impl EmitterResult {
	pub fn is_noop(&self) -> bool {
		matches!(self, EmitterResult::NoOp)
	}
}

impl From<bool> for EmitterResult {
	fn from(suppress: bool) -> Self {
		if suppress {
			EmitterResult::Suppress
		} else {
			EmitterResult::NoOp
		}
	}
}

impl From<NotificationObject> for EmitterResult {
	fn from(notification: NotificationObject) -> Self {
		EmitterResult::Override(notification)
	}
}

impl From<()> for EmitterResult {
	fn from(_: ()) -> Self {
		EmitterResult::NoOp
	}
}

/// Final notification decision after all listeners ran
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationDecision {
	Default(NotificationObject),
	Overridden(NotificationObject),
	Suppressed,
}

impl NotificationDecision {
	pub fn notification(&self) -> Option<&NotificationObject> {
		match self {
			NotificationDecision::Default(n) | NotificationDecision::Overridden(n) => Some(n),
			NotificationDecision::Suppressed => None,
		}
	}
}

/// Record handed to every configured transaction handler after a dispatch
#[derive(Debug, Clone)]
pub struct TransactionEvent {
	pub emitter_result: EmitterResult,
	pub transaction: EmitterPayload,
}

impl TransactionEvent {
	pub fn transaction_data(&self) -> Option<&TransactionData> {
		self.transaction.as_transaction()
	}
}
