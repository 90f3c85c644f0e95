//! Core services of the engine.
//!
//! - `dispatch`: routes server events to listeners
//! - `filter`: account filter parsing and evaluation
//! - `limiter`: token bucket guarding emissions
//! - `registry`: transaction and account subscriptions
//! - `simulation`: simulation fan-out and aggregation
//! - `status`: transaction status state machine
//! - `transport`: connection to the event server

pub mod dispatch;
pub mod filter;
pub mod limiter;
pub mod registry;
pub mod simulation;
pub mod status;
pub mod transport;
