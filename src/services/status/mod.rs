//! Lifecycle tracking for monitored transactions.

mod error;
mod machine;

pub use error::StatusError;
pub use machine::{Replacement, StatusMachine, StatusUpdate, Transition};
