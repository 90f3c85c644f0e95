//! Listener sets keyed by event code.

use parking_lot::RwLock;
use std::{
	collections::HashMap,
	fmt,
	panic::{catch_unwind, AssertUnwindSafe},
	sync::{
		atomic::{AtomicU64, Ordering},
		Arc,
	},
};

use crate::models::{EmitterPayload, EmitterResult, TransactionEventCode};

/// Callback invoked for every matching event
pub type Listener = Arc<dyn Fn(&EmitterPayload) -> EmitterResult + Send + Sync>;

/// Process-unique emitter identity
pub type EmitterId = u64;

static NEXT_EMITTER_ID: AtomicU64 = AtomicU64::new(1);

/// Ordered listeners per [`TransactionEventCode`].
///
/// Listeners registered for [`TransactionEventCode::All`] run after the
/// listeners of the specific code.
pub struct Emitter {
	id: EmitterId,
	listeners: RwLock<HashMap<TransactionEventCode, Vec<Listener>>>,
}

impl Emitter {
	pub fn new() -> Self {
		Self {
			id: NEXT_EMITTER_ID.fetch_add(1, Ordering::Relaxed),
			listeners: RwLock::new(HashMap::new()),
		}
	}

	pub fn id(&self) -> EmitterId {
		self.id
	}

	/// Appends a listener for `code`.
	///
	/// The listener may return anything convertible into an [`EmitterResult`]:
	/// `()` keeps the default notification, `true` suppresses it and a
	/// [`NotificationObject`](crate::models::NotificationObject) replaces it.
	pub fn on<F, R>(&self, code: TransactionEventCode, listener: F)
	where
		F: Fn(&EmitterPayload) -> R + Send + Sync + 'static,
		R: Into<EmitterResult>,
	{
		let listener: Listener = Arc::new(move |payload| listener(payload).into());
		self.listeners.write().entry(code).or_default().push(listener);
	}

	/// Removes every listener for `code`.
	pub fn off(&self, code: &TransactionEventCode) {
		self.listeners.write().remove(code);
	}

	/// Listeners to run for `code`: the code's own, then the `all` ones.
	pub fn listeners_for(&self, code: &TransactionEventCode) -> Vec<Listener> {
		let listeners = self.listeners.read();
		let specific = if *code == TransactionEventCode::All {
			None
		} else {
			listeners.get(code)
		};
		specific
			.into_iter()
			.chain(listeners.get(&TransactionEventCode::All))
			.flat_map(|set| set.iter().cloned())
			.collect()
	}

	pub fn has_listeners(&self) -> bool {
		self.listeners.read().values().any(|set| !set.is_empty())
	}

	/// Runs the listeners for `code` in order on the calling thread.
	///
	/// A panicking listener is skipped and does not stop its siblings.
	pub fn emit(&self, code: &TransactionEventCode, payload: &EmitterPayload) -> Vec<EmitterResult> {
		self.listeners_for(code)
			.into_iter()
			.filter_map(|listener| {
				match catch_unwind(AssertUnwindSafe(|| listener(payload))) {
					Ok(result) => Some(result),
					Err(_) => {
						tracing::warn!(emitter = self.id, event_code = %code, "listener panicked");
						None
					}
				}
			})
			.collect()
	}
}

impl Default for Emitter {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Debug for Emitter {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let listeners = self.listeners.read();
		let counts: HashMap<&str, usize> = listeners
			.iter()
			.map(|(code, set)| (code.as_str(), set.len()))
			.collect();
		f.debug_struct("Emitter")
			.field("id", &self.id)
			.field("listeners", &counts)
			.finish()
	}
}
