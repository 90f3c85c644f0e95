//! Filter expression tree.
//!
//! A filter is either a [`Filter::Primitive`] leaf holding field constraints
//! or a [`Filter::Group`] combining child filters. Modifiers inherited from
//! enclosing groups are resolved when the tree is built, so every node carries
//! the effective settings it is evaluated with.

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::services::filter::helpers::Numeric;

/// How child results of a group are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Join {
	#[default]
	And,
	Or,
}

/// String comparison flags (`_text`, `_word`, `_start`, `_end`, `_regexp`).
///
/// With no flag set strings are compared for equality. Several flags may be
/// set at once; all of them must then hold. `_regexp` takes over entirely.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StringMatch {
	pub text: bool,
	pub word: bool,
	pub start: bool,
	pub end: bool,
	pub regexp: bool,
	/// Token separator for `_word`; whitespace when unset
	pub separator: Option<String>,
}

impl StringMatch {
	pub fn is_exact(&self) -> bool {
		!(self.text || self.word || self.start || self.end || self.regexp)
	}
}

/// Scalar a field is compared against
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
	Text(String),
	Number(Numeric),
	Bool(bool),
}

/// Bound of a range constraint
#[derive(Debug, Clone, PartialEq)]
pub enum Bound {
	Number(Numeric),
	Date(DateTime<Utc>),
}

/// `{from, to, gt, lt, gte, lte}`; `from`/`to`/`gte`/`lte` are inclusive
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RangeConstraint {
	pub from: Option<Bound>,
	pub to: Option<Bound>,
	pub gt: Option<Bound>,
	pub lt: Option<Bound>,
	pub gte: Option<Bound>,
	pub lte: Option<Bound>,
}

impl RangeConstraint {
	/// Lower bounds with their inclusiveness
	pub fn lower_bounds(&self) -> impl Iterator<Item = (&Bound, bool)> {
		[
			self.from.as_ref().map(|b| (b, true)),
			self.gte.as_ref().map(|b| (b, true)),
			self.gt.as_ref().map(|b| (b, false)),
		]
		.into_iter()
		.flatten()
	}

	/// Upper bounds with their inclusiveness
	pub fn upper_bounds(&self) -> impl Iterator<Item = (&Bound, bool)> {
		[
			self.to.as_ref().map(|b| (b, true)),
			self.lte.as_ref().map(|b| (b, true)),
			self.lt.as_ref().map(|b| (b, false)),
		]
		.into_iter()
		.flatten()
	}

	pub fn is_date_range(&self) -> bool {
		self.lower_bounds()
			.chain(self.upper_bounds())
			.any(|(bound, _)| matches!(bound, Bound::Date(_)))
	}
}

#[derive(Debug, Clone)]
pub enum Constraint {
	/// Field equals the scalar
	Equals(Scalar),
	/// Field equals any of the scalars
	OneOf(Vec<Scalar>),
	Range(RangeConstraint),
	/// Field matches any of the compiled patterns (`_regexp`)
	Pattern(Vec<Regex>),
}

#[derive(Debug, Clone)]
pub struct FieldConstraint {
	/// Dotted path into the event record
	pub field: String,
	pub constraint: Constraint,
}

/// Leaf node: every constraint must hold
#[derive(Debug, Clone, Default)]
pub struct PrimitiveFilter {
	pub constraints: Vec<FieldConstraint>,
	pub negate: bool,
	pub string_match: StringMatch,
	/// Maximum nesting depth searched for field names (`_propertySearch`)
	pub property_search: Option<usize>,
}

/// Inner node combining `terms`
#[derive(Debug, Clone, Default)]
pub struct GroupFilter {
	pub join: Join,
	pub negate: bool,
	pub terms: Vec<Filter>,
}

#[derive(Debug, Clone)]
pub enum Filter {
	Primitive(PrimitiveFilter),
	Group(GroupFilter),
}

impl Filter {
	/// Filter that matches every event
	pub fn match_all() -> Self {
		Filter::Primitive(PrimitiveFilter::default())
	}

	/// Negates this filter by wrapping it in a `_not` group.
	pub fn negated(self) -> Self {
		Filter::Group(GroupFilter {
			join: Join::And,
			negate: true,
			terms: vec![self],
		})
	}

	pub fn all(terms: Vec<Filter>) -> Self {
		Filter::Group(GroupFilter {
			join: Join::And,
			negate: false,
			terms,
		})
	}

	pub fn any(terms: Vec<Filter>) -> Self {
		Filter::Group(GroupFilter {
			join: Join::Or,
			negate: false,
			terms,
		})
	}

	/// Evaluates the filter against an event record.
	pub fn matches(&self, event: &serde_json::Value) -> bool {
		super::matcher::matches(event, self)
	}
}
