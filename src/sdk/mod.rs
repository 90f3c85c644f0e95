//! Caller-facing surface of the engine.
//!
//! - `client`: the [`Sdk`] facade (subscriptions, events, configs, simulation)
//! - `requests`: correlation of request/response exchanges
//! - `simulator`: simulation through the event server
//! - `stamp`: identity fields added to outbound messages
//! - `validation`: hash and address checks

mod client;
mod error;
mod requests;
mod simulator;
mod stamp;
mod validation;

pub use client::{AccountDetails, ConfigResponse, ErrorHook, Sdk};
pub use error::report_errors;
pub use requests::{PendingRequests, RequestFailure, RequestTicket};
pub use simulator::TransportSimulator;
pub use stamp::MessageStamp;
pub use validation::{validate_address, validate_transaction_hash};
