//! Concurrent subscription indices.
//!
//! Both indices are sharded maps keyed by `(chain, normalised key)`, so
//! registering or removing one key never blocks resolution of another.
//! Account filters live behind an `Arc` snapshot that is swapped as a whole:
//! an evaluation that already cloned the snapshot keeps using it.

use dashmap::DashMap;
use parking_lot::RwLock;
use serde_json::Value;
use std::{fmt, sync::Arc};

use crate::{
	models::{ChainId, Subscription},
	services::{
		filter::{helpers::normalize_address, parse_filters, Filter},
		registry::{
			emitter::{Emitter, EmitterId},
			error::RegistryError,
		},
	},
};

type IndexKey = (ChainId, String);

/// Returned by [`SubscriptionRegistry::register`] and used to undo it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegistrationHandle {
	pub chain_id: ChainId,
	/// Normalised hash or address
	pub key: String,
	pub emitter: EmitterId,
	pub is_account: bool,
}

impl fmt::Display for RegistrationHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}/{}#{}", self.chain_id, self.key, self.emitter)
	}
}

/// A subscription an event was resolved to
#[derive(Debug, Clone)]
pub enum Resolved {
	Transaction {
		/// Hash the subscription was registered under
		id: String,
		emitter: Arc<Emitter>,
	},
	Account {
		address: String,
		emitter: Arc<Emitter>,
		/// Snapshot of the filters in force when the event was resolved
		filters: Arc<Vec<Filter>>,
	},
}

impl Resolved {
	pub fn emitter(&self) -> &Arc<Emitter> {
		match self {
			Resolved::Transaction { emitter, .. } | Resolved::Account { emitter, .. } => emitter,
		}
	}
}

#[derive(Debug)]
struct TransactionEntry {
	id: String,
	emitter: Arc<Emitter>,
}

#[derive(Debug)]
struct AccountEntry {
	address: String,
	emitters: Vec<Arc<Emitter>>,
	filters: RwLock<Arc<Vec<Filter>>>,
	raw_filters: Option<Vec<Value>>,
	abi: Option<Vec<Value>>,
}

impl AccountEntry {
	fn new(address: &str) -> Self {
		Self {
			address: address.to_string(),
			emitters: Vec::new(),
			filters: RwLock::new(Arc::new(Vec::new())),
			raw_filters: None,
			abi: None,
		}
	}
}

#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
	transactions: DashMap<IndexKey, TransactionEntry>,
	/// Replacement hash -> hash the subscription was registered under
	aliases: DashMap<IndexKey, String>,
	accounts: DashMap<IndexKey, AccountEntry>,
	/// Filters applied to every account on the chain
	global_filters: DashMap<ChainId, Arc<Vec<Filter>>>,
}

fn index_key(chain_id: &ChainId, key: &str) -> IndexKey {
	(chain_id.clone(), normalize_address(key))
}

impl SubscriptionRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers `emitter` for `subscription`.
	///
	/// Registering an already watched transaction is a no-op returning the
	/// existing handle. Account filters are parsed here; a filter that does
	/// not parse rejects the registration.
	pub fn register(
		&self,
		subscription: &Subscription,
		emitter: Arc<Emitter>,
	) -> Result<RegistrationHandle, RegistryError> {
		let (chain_id, id) = (subscription.chain_id(), subscription.id());
		let key = index_key(chain_id, id);

		match subscription {
			Subscription::Transaction { .. } => {
				let entry = self
					.transactions
					.entry(key.clone())
					.or_insert_with(|| {
						tracing::debug!(chain_id = %chain_id, hash = %id, "registered transaction");
						TransactionEntry {
							id: id.to_string(),
							emitter,
						}
					});
				Ok(RegistrationHandle {
					chain_id: key.0,
					key: key.1,
					emitter: entry.emitter.id(),
					is_account: false,
				})
			}
			Subscription::Account { filters, abi, .. } => {
				let parsed = filters.as_deref().map(parse_filters).transpose()?;
				let handle = RegistrationHandle {
					chain_id: key.0.clone(),
					key: key.1.clone(),
					emitter: emitter.id(),
					is_account: true,
				};

				let mut entry = self
					.accounts
					.entry(key)
					.or_insert_with(|| AccountEntry::new(id));
				if entry.emitters.iter().any(|e| e.id() == emitter.id()) {
					return Err(RegistryError::duplicate_account(handle.to_string()));
				}
				if let Some(parsed) = parsed {
					*entry.filters.write() = Arc::new(parsed);
					entry.raw_filters = filters.clone();
				}
				if abi.is_some() {
					entry.abi = abi.clone();
				}
				entry.emitters.push(emitter);
				tracing::debug!(chain_id = %chain_id, address = %id, "registered account");
				Ok(handle)
			}
		}
	}

	/// Removes the registration behind `handle`.
	pub fn unregister(&self, handle: &RegistrationHandle) -> Result<(), RegistryError> {
		let key = (handle.chain_id.clone(), handle.key.clone());
		if handle.is_account {
			let removed = match self.accounts.get_mut(&key) {
				Some(mut entry) => {
					let before = entry.emitters.len();
					entry.emitters.retain(|e| e.id() != handle.emitter);
					before != entry.emitters.len()
				}
				None => false,
			};
			if !removed {
				return Err(RegistryError::unknown_handle(handle.to_string()));
			}
			self.accounts
				.remove_if(&key, |_, entry| entry.emitters.is_empty());
			return Ok(());
		}

		match self
			.transactions
			.remove_if(&key, |_, entry| entry.emitter.id() == handle.emitter)
		{
			Some(_) => {
				self.drop_aliases(&key);
				Ok(())
			}
			None => Err(RegistryError::unknown_handle(handle.to_string())),
		}
	}

	/// Drops every subscription for a hash or address, returning whether anything was removed.
	pub fn unregister_key(&self, chain_id: &ChainId, key: &str) -> bool {
		let key = index_key(chain_id, key);
		let canonical = self.canonical_key(&key);
		let transaction = self.transactions.remove(&canonical).is_some();
		if transaction {
			self.drop_aliases(&canonical);
		}
		let account = self.accounts.remove(&key).is_some();
		transaction || account
	}

	/// Routes events for `new_hash` to the subscription registered for `old_hash`.
	pub fn alias_transaction(&self, chain_id: &ChainId, old_hash: &str, new_hash: &str) {
		let old_key = index_key(chain_id, old_hash);
		let canonical = self.canonical_key(&old_key);
		let new_key = index_key(chain_id, new_hash);
		if new_key != canonical {
			tracing::debug!(chain_id = %chain_id, old_hash, new_hash, "aliasing replaced transaction");
			self.aliases.insert(new_key, canonical.1);
		}
	}

	/// Key the transaction was registered under, following replacement aliases.
	pub fn canonical_hash(&self, chain_id: &ChainId, hash: &str) -> String {
		self.canonical_key(&index_key(chain_id, hash)).1
	}

	fn drop_aliases(&self, canonical: &IndexKey) {
		self.aliases
			.retain(|(chain_id, _), target| !(*chain_id == canonical.0 && *target == canonical.1));
	}

	fn canonical_key(&self, key: &IndexKey) -> IndexKey {
		match self.aliases.get(key) {
			Some(target) => (key.0.clone(), target.clone()),
			None => key.clone(),
		}
	}

	pub fn is_watching_transaction(&self, chain_id: &ChainId, hash: &str) -> bool {
		let key = self.canonical_key(&index_key(chain_id, hash));
		self.transactions.contains_key(&key)
	}

	pub fn is_watching_account(&self, chain_id: &ChainId, address: &str) -> bool {
		self.accounts
			.get(&index_key(chain_id, address))
			.is_some_and(|entry| !entry.emitters.is_empty())
	}

	/// Subscriptions interested in `key`, a transaction hash or an address.
	pub fn resolve(&self, chain_id: &ChainId, key: &str) -> Vec<Resolved> {
		let key = index_key(chain_id, key);
		let mut resolved = Vec::new();

		if let Some(entry) = self.transactions.get(&self.canonical_key(&key)) {
			resolved.push(Resolved::Transaction {
				id: entry.id.clone(),
				emitter: entry.emitter.clone(),
			});
		}

		if let Some(entry) = self.accounts.get(&key) {
			let filters = self.effective_filters(chain_id, &entry);
			resolved.extend(entry.emitters.iter().map(|emitter| Resolved::Account {
				address: entry.address.clone(),
				emitter: emitter.clone(),
				filters: filters.clone(),
			}));
		}

		resolved
	}

	fn effective_filters(&self, chain_id: &ChainId, entry: &AccountEntry) -> Arc<Vec<Filter>> {
		let own = entry.filters.read().clone();
		match self.global_filters.get(chain_id) {
			Some(global) if !global.is_empty() => {
				Arc::new(global.iter().chain(own.iter()).cloned().collect())
			}
			_ => own,
		}
	}

	/// Replaces the filters of the account behind `handle`.
	pub fn replace_filters(
		&self,
		handle: &RegistrationHandle,
		filters: Vec<Value>,
	) -> Result<(), RegistryError> {
		let key = (handle.chain_id.clone(), handle.key.clone());
		if !handle.is_account || !self.accounts.contains_key(&key) {
			return Err(RegistryError::unknown_handle(handle.to_string()));
		}
		self.set_account_filters(&handle.chain_id, &handle.key, filters)
	}

	/// Parses and installs filters for `address`, creating the entry if needed.
	///
	/// The new snapshot is built completely before it replaces the old one.
	pub fn set_account_filters(
		&self,
		chain_id: &ChainId,
		address: &str,
		filters: Vec<Value>,
	) -> Result<(), RegistryError> {
		let parsed = Arc::new(parse_filters(&filters)?);
		let mut entry = self
			.accounts
			.entry(index_key(chain_id, address))
			.or_insert_with(|| AccountEntry::new(address));
		*entry.filters.write() = parsed;
		entry.raw_filters = Some(filters);
		drop(entry);
		tracing::debug!(chain_id = %chain_id, address, "replaced account filters");
		Ok(())
	}

	/// Installs filters applied to every account on `chain_id`.
	pub fn set_global_filters(
		&self,
		chain_id: &ChainId,
		filters: Vec<Value>,
	) -> Result<(), RegistryError> {
		let parsed = parse_filters(&filters)?;
		self.global_filters
			.insert(chain_id.clone(), Arc::new(parsed));
		Ok(())
	}

	/// Snapshot of all live subscriptions, used to replay them after a reconnect.
	pub fn subscriptions(&self) -> Vec<Subscription> {
		let transactions = self
			.transactions
			.iter()
			.map(|entry| Subscription::transaction(entry.id.clone(), entry.key().0.clone()));
		let accounts = self
			.accounts
			.iter()
			.filter(|entry| !entry.emitters.is_empty())
			.map(|entry| Subscription::Account {
				id: entry.address.clone(),
				chain_id: entry.key().0.clone(),
				filters: entry.raw_filters.clone(),
				abi: entry.abi.clone(),
			});
		transactions.chain(accounts).collect()
	}

	pub fn is_empty(&self) -> bool {
		self.transactions.is_empty() && self.accounts.is_empty()
	}

	/// Drops every subscription.
	pub fn clear(&self) {
		self.transactions.clear();
		self.aliases.clear();
		self.accounts.clear();
		self.global_filters.clear();
	}
}
