//! Builds a [`Filter`] tree from its JSON document.
//!
//! Keys starting with `_` are modifiers, `terms` holds child filters and every
//! other key constrains an event field. Modifier inheritance is resolved here
//! so the matcher never has to look at ancestors.

use regex::RegexBuilder;
use serde_json::{Map, Value};

use crate::services::filter::{
	error::FilterError,
	helpers::{number_from_str, parse_date, parse_number},
	tree::{
		Bound, Constraint, FieldConstraint, Filter, GroupFilter, Join, PrimitiveFilter,
		RangeConstraint, Scalar, StringMatch,
	},
};

pub const DEFAULT_PROPERTY_SEARCH_DEPTH: usize = 3;

const RANGE_KEYS: [&str; 6] = ["from", "to", "gt", "lt", "gte", "lte"];

/// Modifiers handed down from enclosing groups
#[derive(Debug, Clone, Default)]
struct Inherited {
	string_match: StringMatch,
	property_search: Option<usize>,
}

/// Modifiers declared on a single node
#[derive(Debug, Default)]
struct NodeModifiers {
	negate: bool,
	join: Option<Join>,
	text: Option<bool>,
	word: Option<bool>,
	start: Option<bool>,
	end: Option<bool>,
	regexp: Option<bool>,
	separator: Option<String>,
	property_search: Option<bool>,
	property_search_depth: Option<usize>,
}

impl NodeModifiers {
	/// Applies this node's settings on top of the inherited ones.
	fn resolve(&self, parent: &Inherited) -> Inherited {
		let mut string_match = parent.string_match.clone();
		if let Some(text) = self.text {
			string_match.text = text;
		}
		if let Some(word) = self.word {
			string_match.word = word;
		}
		if let Some(start) = self.start {
			string_match.start = start;
		}
		if let Some(end) = self.end {
			string_match.end = end;
		}
		if let Some(regexp) = self.regexp {
			string_match.regexp = regexp;
		}
		if self.separator.is_some() {
			string_match.separator = self.separator.clone();
		}

		let property_search = match (self.property_search, self.property_search_depth) {
			(Some(false), _) => None,
			(Some(true), depth) => Some(
				depth
					.or(parent.property_search)
					.unwrap_or(DEFAULT_PROPERTY_SEARCH_DEPTH),
			),
			(None, Some(depth)) => parent.property_search.map(|_| depth),
			(None, None) => parent.property_search,
		};

		Inherited {
			string_match,
			property_search,
		}
	}
}

/// Parses a filter document.
///
/// # Errors
/// Returns a [`FilterError`] when the document is not an object, uses an
/// unknown modifier or `_join` value, carries a regex that does not compile,
/// or a range bound that is neither numeric nor an RFC 3339 date.
pub fn parse_filter(document: &Value) -> Result<Filter, FilterError> {
	parse_node(document, &Inherited::default())
}

/// Parses every filter of an account subscription.
pub fn parse_filters(documents: &[Value]) -> Result<Vec<Filter>, FilterError> {
	documents.iter().map(parse_filter).collect()
}

fn parse_node(document: &Value, parent: &Inherited) -> Result<Filter, FilterError> {
	let object = document.as_object().ok_or_else(|| {
		FilterError::invalid_filter(format!("filter node must be an object, got {}", document))
	})?;

	let modifiers = parse_modifiers(object)?;
	let inherited = modifiers.resolve(parent);
	let constraints = parse_constraints(object, &inherited)?;

	match object.get("terms") {
		Some(Value::Array(terms)) => {
			let mut children = Vec::with_capacity(terms.len() + 1);
			if !constraints.is_empty() {
				children.push(Filter::Primitive(PrimitiveFilter {
					constraints,
					negate: false,
					string_match: inherited.string_match.clone(),
					property_search: inherited.property_search,
				}));
			}
			for term in terms {
				children.push(parse_node(term, &inherited)?);
			}
			Ok(Filter::Group(GroupFilter {
				join: modifiers.join.unwrap_or_default(),
				negate: modifiers.negate,
				terms: children,
			}))
		}
		Some(other) => Err(FilterError::invalid_filter(format!(
			"terms must be an array, got {}",
			other
		))),
		None => Ok(Filter::Primitive(PrimitiveFilter {
			constraints,
			negate: modifiers.negate,
			string_match: inherited.string_match,
			property_search: inherited.property_search,
		})),
	}
}

fn parse_modifiers(object: &Map<String, Value>) -> Result<NodeModifiers, FilterError> {
	let mut modifiers = NodeModifiers::default();

	for (key, value) in object.iter().filter(|(key, _)| key.starts_with('_')) {
		match key.as_str() {
			"_not" => modifiers.negate = expect_bool(key, value)?,
			"_join" => modifiers.join = Some(parse_join(value)?),
			"_text" => modifiers.text = Some(expect_bool(key, value)?),
			"_word" => modifiers.word = Some(expect_bool(key, value)?),
			"_start" => modifiers.start = Some(expect_bool(key, value)?),
			"_end" => modifiers.end = Some(expect_bool(key, value)?),
			"_regexp" => modifiers.regexp = Some(expect_bool(key, value)?),
			"_separator" => {
				let separator = value.as_str().ok_or_else(|| {
					FilterError::invalid_filter(format!("_separator must be a string, got {}", value))
				})?;
				modifiers.separator = Some(separator.to_string());
			}
			"_propertySearch" => modifiers.property_search = Some(expect_bool(key, value)?),
			"_propertySearchDepth" => {
				let depth = value.as_u64().ok_or_else(|| {
					FilterError::invalid_filter(format!(
						"_propertySearchDepth must be a non-negative integer, got {}",
						value
					))
				})?;
				modifiers.property_search_depth = Some(depth as usize);
			}
			unknown => {
				return Err(FilterError::invalid_filter(format!(
					"unknown modifier {}",
					unknown
				)))
			}
		}
	}

	Ok(modifiers)
}

fn expect_bool(key: &str, value: &Value) -> Result<bool, FilterError> {
	value
		.as_bool()
		.ok_or_else(|| FilterError::invalid_filter(format!("{} must be a boolean, got {}", key, value)))
}

fn parse_join(value: &Value) -> Result<Join, FilterError> {
	match value.as_str().map(str::to_ascii_uppercase).as_deref() {
		Some("AND") => Ok(Join::And),
		Some("OR") => Ok(Join::Or),
		_ => Err(FilterError::invalid_filter(format!(
			"_join must be AND or OR, got {}",
			value
		))),
	}
}

fn parse_constraints(
	object: &Map<String, Value>,
	inherited: &Inherited,
) -> Result<Vec<FieldConstraint>, FilterError> {
	let mut constraints = Vec::new();
	for (key, value) in object
		.iter()
		.filter(|(key, _)| !key.starts_with('_') && key.as_str() != "terms")
	{
		collect_field(key, value, inherited, &mut constraints)?;
	}
	Ok(constraints)
}

fn collect_field(
	field: &str,
	value: &Value,
	inherited: &Inherited,
	out: &mut Vec<FieldConstraint>,
) -> Result<(), FilterError> {
	let constraint = match value {
		Value::Null => return Ok(()),
		Value::Object(nested) => {
			let range_keys = nested
				.keys()
				.filter(|key| RANGE_KEYS.contains(&key.as_str()))
				.count();
			if range_keys == 0 {
				for (key, inner) in nested {
					collect_field(&format!("{}.{}", field, key), inner, inherited, out)?;
				}
				return Ok(());
			}
			if range_keys != nested.len() {
				return Err(FilterError::invalid_range(format!(
					"{} mixes range bounds with other keys",
					field
				)));
			}
			Constraint::Range(parse_range(field, nested)?)
		}
		Value::Array(items) if inherited.string_match.regexp => Constraint::Pattern(
			items
				.iter()
				.map(|item| compile_pattern(field, item))
				.collect::<Result<_, _>>()?,
		),
		Value::Array(items) => Constraint::OneOf(
			items
				.iter()
				.map(|item| parse_scalar(field, item))
				.collect::<Result<_, _>>()?,
		),
		scalar if inherited.string_match.regexp => {
			Constraint::Pattern(vec![compile_pattern(field, scalar)?])
		}
		scalar => Constraint::Equals(parse_scalar(field, scalar)?),
	};

	out.push(FieldConstraint {
		field: field.to_string(),
		constraint,
	});
	Ok(())
}

fn parse_scalar(field: &str, value: &Value) -> Result<Scalar, FilterError> {
	match value {
		Value::String(s) => Ok(Scalar::Text(s.clone())),
		Value::Bool(b) => Ok(Scalar::Bool(*b)),
		Value::Number(_) => parse_number(value).map(Scalar::Number).ok_or_else(|| {
			FilterError::invalid_filter(format!("{}: unsupported number {}", field, value))
		}),
		other => Err(FilterError::invalid_filter(format!(
			"{}: expected a scalar, got {}",
			field, other
		))),
	}
}

fn compile_pattern(field: &str, value: &Value) -> Result<regex::Regex, FilterError> {
	let pattern = value.as_str().ok_or_else(|| {
		FilterError::invalid_pattern(format!("{}: pattern must be a string, got {}", field, value))
	})?;
	Ok(RegexBuilder::new(pattern).case_insensitive(true).build()?)
}

fn parse_range(field: &str, bounds: &Map<String, Value>) -> Result<RangeConstraint, FilterError> {
	let mut range = RangeConstraint::default();
	for (key, value) in bounds {
		let bound = parse_bound(field, key, value)?;
		let slot = match key.as_str() {
			"from" => &mut range.from,
			"to" => &mut range.to,
			"gt" => &mut range.gt,
			"lt" => &mut range.lt,
			"gte" => &mut range.gte,
			_ => &mut range.lte,
		};
		*slot = Some(bound);
	}
	Ok(range)
}

fn parse_bound(field: &str, key: &str, value: &Value) -> Result<Bound, FilterError> {
	let invalid = || FilterError::invalid_range(format!("{}.{}: {}", field, key, value));
	match value {
		Value::Number(_) => parse_number(value).map(Bound::Number).ok_or_else(invalid),
		Value::String(raw) => number_from_str(raw)
			.map(Bound::Number)
			.or_else(|| parse_date(raw).map(Bound::Date))
			.ok_or_else(invalid),
		_ => Err(invalid()),
	}
}
