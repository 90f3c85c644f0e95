//! Transaction simulation.
//!
//! - `aggregator`: merges per-transaction outputs into a [`MultiSimOutput`](crate::models::MultiSimOutput)
//! - `simulator`: the seam through which single transactions are simulated

mod aggregator;
mod error;
mod simulator;

pub use aggregator::{aggregate, CALL_REVERTED, CALL_SUCCESS};
pub use error::SimulationError;
pub use simulator::{simulate_all, Simulator};
