use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RateLimitError {
	#[error("Rate limit exceeded: {requested} points requested, retry in {retry_after:?}")]
	RateLimited { requested: u32, retry_after: Duration },

	#[error("Evicted from a full backlog of {capacity} queued emissions")]
	Evicted { capacity: usize },

	#[error("Weight {weight} exceeds the {points} points available per window")]
	WeightExceedsCapacity { weight: u32, points: u32 },
}
