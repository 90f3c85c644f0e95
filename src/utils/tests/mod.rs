//! Test helper utilities
//!
//! - `builders`: builders for engine configurations and server payloads

pub mod builders {
	pub mod config;
	pub mod transaction;
}

pub use builders::*;
