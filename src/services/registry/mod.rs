//! Subscription registry.
//!
//! Maps chain-scoped transaction hashes and account addresses to the
//! [`Emitter`]s listening on them:
//! - `emitter`: per-subscription listener sets
//! - `registry`: the concurrent hash and address indices

mod emitter;
mod error;
mod registry;

pub use emitter::{Emitter, EmitterId, Listener};
pub use error::RegistryError;
pub use registry::{RegistrationHandle, Resolved, SubscriptionRegistry};
