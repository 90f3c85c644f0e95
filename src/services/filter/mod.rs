//! Filter engine for account subscriptions.
//!
//! Filters are JSON documents attached to an account subscription. They are
//! parsed into a [`Filter`] tree once at registration time and evaluated
//! against every event routed to the subscription:
//! - `parser`: document validation and modifier inheritance
//! - `matcher`: evaluation against an event record
//! - `helpers`: value normalisation shared by both

mod error;
mod matcher;
mod parser;
mod tree;

pub mod helpers;

pub use error::FilterError;
pub use matcher::{matches, matches_all};
pub use parser::{parse_filter, parse_filters, DEFAULT_PROPERTY_SEARCH_DEPTH};
pub use tree::{
	Bound, Constraint, FieldConstraint, Filter, GroupFilter, Join, PrimitiveFilter,
	RangeConstraint, Scalar, StringMatch,
};
