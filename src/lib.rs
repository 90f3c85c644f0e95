//! Client-side engine for blockchain transaction and account events.
//!
//! The engine keeps a connection to an event server, tracks the status of
//! watched transactions, evaluates account filters and delivers events to
//! registered listeners under a shared rate limit.
//!
//! # Architecture
//! - `models`: configuration and wire data structures
//! - `services`: filter engine, status machine, registry, dispatcher,
//!   rate limiter, simulation aggregator and transport
//! - `sdk`: the [`sdk::Sdk`] facade tying the services together
//! - `utils`: logging setup and test builders

pub mod models;
pub mod sdk;
pub mod services;
pub mod utils;
