//! Test doubles for the engine's seams.

mod simulators;
mod transports;

pub use simulators::*;
pub use transports::*;
