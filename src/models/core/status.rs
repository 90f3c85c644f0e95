//! Transaction status and event code vocabularies.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};

/// Lifecycle status of a monitored transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
	#[default]
	Pending,
	Confirmed,
	Speedup,
	Cancel,
	Failed,
	Dropped,
	PendingSimulation,
	Stuck,
	Simulated,
}

impl Status {
	/// Statuses after which no further transition is accepted (reorgs aside).
	pub fn is_terminal(&self) -> bool {
		matches!(
			self,
			Status::Confirmed | Status::Failed | Status::Dropped | Status::Simulated
		)
	}

	/// Event code the server uses when reporting this status.
	pub fn default_event_code(&self) -> TransactionEventCode {
		match self {
			Status::Pending => TransactionEventCode::TxPool,
			Status::Confirmed => TransactionEventCode::TxConfirmed,
			Status::Speedup => TransactionEventCode::TxSpeedUp,
			Status::Cancel => TransactionEventCode::TxCancel,
			Status::Failed => TransactionEventCode::TxFailed,
			Status::Dropped => TransactionEventCode::TxDropped,
			Status::PendingSimulation => TransactionEventCode::TxPoolSimulation,
			Status::Stuck => TransactionEventCode::Other("txStuck".to_string()),
			Status::Simulated => TransactionEventCode::Other("txSimulation".to_string()),
		}
	}
}

impl fmt::Display for Status {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let value = serde_json::to_value(self).map_err(|_| fmt::Error)?;
		write!(f, "{}", value.as_str().unwrap_or_default())
	}
}

impl FromStr for Status {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		serde_json::from_value(serde_json::Value::String(s.to_string()))
			.map_err(|_| format!("Unknown status: {}", s))
	}
}

/// Event codes listeners can register for.
///
/// The server may introduce codes that are not known here; those are kept
/// verbatim in [`TransactionEventCode::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TransactionEventCode {
	TxSent,
	TxPool,
	TxConfirmed,
	TxSpeedUp,
	TxCancel,
	TxFailed,
	TxRequest,
	NsfFail,
	TxRepeat,
	TxAwaitingApproval,
	TxConfirmReminder,
	TxSendFail,
	TxError,
	TxUnderPriced,
	TxDropped,
	TxPoolSimulation,
	All,
	Other(String),
}

impl TransactionEventCode {
	pub fn as_str(&self) -> &str {
		match self {
			Self::TxSent => "txSent",
			Self::TxPool => "txPool",
			Self::TxConfirmed => "txConfirmed",
			Self::TxSpeedUp => "txSpeedUp",
			Self::TxCancel => "txCancel",
			Self::TxFailed => "txFailed",
			Self::TxRequest => "txRequest",
			Self::NsfFail => "nsfFail",
			Self::TxRepeat => "txRepeat",
			Self::TxAwaitingApproval => "txAwaitingApproval",
			Self::TxConfirmReminder => "txConfirmReminder",
			Self::TxSendFail => "txSendFail",
			Self::TxError => "txError",
			Self::TxUnderPriced => "txUnderPriced",
			Self::TxDropped => "txDropped",
			Self::TxPoolSimulation => "txPoolSimulation",
			Self::All => "all",
			Self::Other(code) => code.as_str(),
		}
	}

	/// Status implied by an event code, if the code maps to one.
	pub fn implied_status(&self) -> Option<Status> {
		match self {
			Self::TxPool => Some(Status::Pending),
			Self::TxConfirmed => Some(Status::Confirmed),
			Self::TxSpeedUp => Some(Status::Speedup),
			Self::TxCancel => Some(Status::Cancel),
			Self::TxFailed => Some(Status::Failed),
			Self::TxDropped => Some(Status::Dropped),
			Self::TxPoolSimulation => Some(Status::PendingSimulation),
			Self::Other(code) if code == "txStuck" => Some(Status::Stuck),
			_ => None,
		}
	}
}

impl From<&str> for TransactionEventCode {
	fn from(code: &str) -> Self {
		match code {
			"txSent" => Self::TxSent,
			"txPool" => Self::TxPool,
			"txConfirmed" => Self::TxConfirmed,
			"txSpeedUp" => Self::TxSpeedUp,
			"txCancel" => Self::TxCancel,
			"txFailed" => Self::TxFailed,
			"txRequest" => Self::TxRequest,
			"nsfFail" => Self::NsfFail,
			"txRepeat" => Self::TxRepeat,
			"txAwaitingApproval" => Self::TxAwaitingApproval,
			"txConfirmReminder" => Self::TxConfirmReminder,
			"txSendFail" => Self::TxSendFail,
			"txError" => Self::TxError,
			"txUnderPriced" => Self::TxUnderPriced,
			"txDropped" => Self::TxDropped,
			"txPoolSimulation" => Self::TxPoolSimulation,
			"all" => Self::All,
			other => Self::Other(other.to_string()),
		}
	}
}

impl fmt::Display for TransactionEventCode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.as_str())
	}
}

impl Serialize for TransactionEventCode {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(self.as_str())
	}
}

impl<'de> Deserialize<'de> for TransactionEventCode {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let code = String::deserialize(deserializer)?;
		Ok(Self::from(code.as_str()))
	}
}
