//! Emission rate limiting.
//!
//! A single [`RateLimiter`] is shared by every dispatch worker. What happens
//! to an emission once the bucket is empty depends on the configured
//! [`OverflowPolicy`](crate::models::OverflowPolicy); workers using the
//! `drop-oldest` policy park emissions in a [`Backlog`].

mod backlog;
mod bucket;
mod error;

pub use backlog::Backlog;
pub use bucket::{EngineClock, RateLimiter};
pub use error::RateLimitError;
