//! Event dispatch.
//!
//! Takes classified server events through subscription resolution, account
//! filtering, status tracking, rate limiting and listener invocation:
//! - `coordinator`: routes events to key-owning workers
//! - `worker`: per-shard processing and tracked transaction state
//! - `invoke`: listener isolation (panics, timeouts)
//! - `report`: outcomes and listener result folding

mod coordinator;
mod error;
mod event;
mod invoke;
mod report;
mod tracked;
mod worker;

pub use coordinator::Dispatcher;
pub use error::{DispatchError, ListenerFailure};
pub use event::InboundEvent;
pub use invoke::{invoke_listeners, Invocation};
pub use report::{fold_results, DispatchOutcome, DispatchReport};
pub use tracked::{TrackedSnapshot, TrackedTransaction};
pub use worker::TransactionHandler;
