//! Subscription and configuration models.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::ChainId;

/// Account-level configuration pushed to the event server.
///
/// `filters` is kept as raw JSON here; it is compiled into a filter tree when
/// the owning subscription is registered.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
	/// Address the configuration applies to, or `global`
	pub scope: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub filters: Option<Vec<Value>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub abi: Option<Vec<Value>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub watch_address: Option<bool>,
}

impl Config {
	pub fn is_global(&self) -> bool {
		self.scope.eq_ignore_ascii_case("global")
	}
}

/// A standing interest in a hash's or an address's events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Subscription {
	Transaction {
		id: String,
		#[serde(rename = "chainId")]
		chain_id: ChainId,
	},
	Account {
		id: String,
		#[serde(rename = "chainId")]
		chain_id: ChainId,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		filters: Option<Vec<Value>>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		abi: Option<Vec<Value>>,
	},
}

impl Subscription {
	pub fn transaction(hash: impl Into<String>, chain_id: ChainId) -> Self {
		Subscription::Transaction {
			id: hash.into(),
			chain_id,
		}
	}

	pub fn account(address: impl Into<String>, chain_id: ChainId) -> Self {
		Subscription::Account {
			id: address.into(),
			chain_id,
			filters: None,
			abi: None,
		}
	}

	pub fn with_filters(mut self, new_filters: Vec<Value>) -> Self {
		if let Subscription::Account { filters, .. } = &mut self {
			*filters = Some(new_filters);
		}
		self
	}

	pub fn id(&self) -> &str {
		match self {
			Subscription::Transaction { id, .. } | Subscription::Account { id, .. } => id,
		}
	}

	pub fn chain_id(&self) -> &ChainId {
		match self {
			Subscription::Transaction { chain_id, .. } | Subscription::Account { chain_id, .. } => {
				chain_id
			}
		}
	}

	pub fn is_account(&self) -> bool {
		matches!(self, Subscription::Account { .. })
	}
}
