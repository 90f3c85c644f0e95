//! Token bucket shared by the dispatch workers.
//!
//! Backed by a direct `governor` limiter: a full bucket holds `points`
//! tokens and one token comes back every `duration / points`, so no more
//! than `points` dispatches fit in any `duration` window. Time is read
//! through [`EngineClock`], which follows the tokio clock so paused-time
//! tests drive refills deterministically.

use governor::{
	clock::Clock,
	middleware::NoOpMiddleware,
	state::{InMemoryState, NotKeyed},
	InsufficientCapacity, Quota,
};
use std::{fmt, num::NonZeroU32, time::Duration};

use crate::{
	models::{LimitRules, RateLimitConfig},
	services::limiter::error::RateLimitError,
};

/// Clock reading `tokio::time`, so a paused runtime also pauses refills
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineClock;

impl Clock for EngineClock {
	type Instant = std::time::Instant;

	fn now(&self) -> Self::Instant {
		tokio::time::Instant::now().into_std()
	}
}

type DirectLimiter =
	governor::RateLimiter<NotKeyed, InMemoryState, EngineClock, NoOpMiddleware<std::time::Instant>>;

/// Token bucket shared by all dispatch workers
pub struct RateLimiter {
	rules: LimitRules,
	weight: u32,
	quota: Quota,
	clock: EngineClock,
	limiter: DirectLimiter,
}

impl fmt::Debug for RateLimiter {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RateLimiter")
			.field("rules", &self.rules)
			.field("weight", &self.weight)
			.field("quota", &self.quota)
			.finish_non_exhaustive()
	}
}

impl RateLimiter {
	/// Creates a full bucket.
	pub fn new(rules: LimitRules, weight: u32) -> Self {
		let burst = NonZeroU32::new(rules.points).unwrap_or(NonZeroU32::MIN);
		let quota = Quota::with_period(rules.duration() / burst.get())
			.unwrap_or_else(|| Quota::per_second(NonZeroU32::MAX))
			.allow_burst(burst);
		let clock = EngineClock;
		Self {
			rules,
			weight: weight.max(1),
			quota,
			limiter: DirectLimiter::direct_with_clock(quota, &clock),
			clock,
		}
	}

	pub fn from_config(config: &RateLimitConfig) -> Self {
		Self::new(config.rules, config.weight)
	}

	pub fn rules(&self) -> LimitRules {
		self.rules
	}

	/// Tokens consumed by one dispatch
	pub fn weight(&self) -> u32 {
		self.weight
	}

	/// Time it takes an empty bucket to regain one dispatch worth of tokens.
	pub fn dispatch_interval(&self) -> Duration {
		self.quota.replenish_interval() * self.weight
	}

	/// Takes one dispatch worth of tokens without waiting.
	pub fn try_acquire(&self) -> Result<(), RateLimitError> {
		self.try_consume(self.weight)
	}

	/// Takes `weight` tokens without waiting.
	///
	/// # Errors
	/// Returns [`RateLimitError::RateLimited`] with the time until enough
	/// tokens are back, or [`RateLimitError::WeightExceedsCapacity`] when even
	/// a full bucket could not cover `weight`.
	pub fn try_consume(&self, weight: u32) -> Result<(), RateLimitError> {
		let Some(tokens) = NonZeroU32::new(weight) else {
			return Ok(());
		};
		match self.limiter.check_n(tokens) {
			Ok(Ok(())) => Ok(()),
			Ok(Err(not_until)) => Err(RateLimitError::RateLimited {
				requested: weight,
				retry_after: not_until.wait_time_from(self.clock.now()),
			}),
			Err(InsufficientCapacity(_)) => Err(RateLimitError::WeightExceedsCapacity {
				weight,
				points: self.quota.burst_size().get(),
			}),
		}
	}

	/// Takes one dispatch worth of tokens, waiting for refills as needed.
	///
	/// Waits on the tokio timer rather than `governor`'s own futures so the
	/// wait follows the same clock as [`EngineClock`].
	pub async fn acquire(&self) -> Result<(), RateLimitError> {
		loop {
			match self.try_acquire() {
				Err(RateLimitError::RateLimited { retry_after, .. }) => {
					tracing::debug!(
						wait_ms = retry_after.as_millis() as u64,
						"rate limit reached, waiting for refill"
					);
					tokio::time::sleep(retry_after.max(Duration::from_millis(1))).await;
				}
				other => return other,
			}
		}
	}
}
