//! Evaluation of a parsed [`Filter`] against an event record.
//!
//! Evaluation is total: fields that are missing or cannot be compared make
//! the constraint fail instead of raising an error.

use serde_json::Value;
use std::cmp::Ordering;

use crate::services::filter::{
	helpers::{contains_words, number_from_str, parse_date, parse_number, value_as_text},
	tree::{
		Bound, Constraint, FieldConstraint, Filter, GroupFilter, Join, PrimitiveFilter,
		RangeConstraint, Scalar, StringMatch,
	},
};

/// Evaluates `filter` against `event`.
pub fn matches(event: &Value, filter: &Filter) -> bool {
	match filter {
		Filter::Primitive(primitive) => matches_primitive(event, primitive),
		Filter::Group(group) => matches_group(event, group),
	}
}

/// Every filter must match; an empty list matches everything.
pub fn matches_all(event: &Value, filters: &[Filter]) -> bool {
	filters.iter().all(|filter| matches(event, filter))
}

fn matches_group(event: &Value, group: &GroupFilter) -> bool {
	let result = match group.join {
		Join::And => group.terms.iter().all(|term| matches(event, term)),
		Join::Or => group.terms.iter().any(|term| matches(event, term)),
	};
	result != group.negate
}

fn matches_primitive(event: &Value, primitive: &PrimitiveFilter) -> bool {
	let result = primitive
		.constraints
		.iter()
		.all(|constraint| matches_field(event, constraint, primitive));
	result != primitive.negate
}

fn matches_field(event: &Value, field: &FieldConstraint, primitive: &PrimitiveFilter) -> bool {
	let mut candidates = Vec::new();
	match primitive.property_search {
		Some(depth) => search_property(event, &field.field, depth, &mut candidates),
		None => resolve_path(event, &field.field, &mut candidates),
	}
	candidates
		.into_iter()
		.any(|value| matches_value(value, &field.constraint, &primitive.string_match))
}

/// Collects every value reachable through a dotted path, fanning out over arrays.
fn resolve_path<'a>(value: &'a Value, path: &str, out: &mut Vec<&'a Value>) {
	if path.is_empty() {
		match value {
			Value::Array(items) => out.extend(items.iter()),
			other => out.push(other),
		}
		return;
	}

	match value {
		Value::Object(map) => {
			if let Some(found) = map.get(path) {
				resolve_path(found, "", out);
			}
			let mut split = path.splitn(2, '.');
			if let (Some(head), Some(rest)) = (split.next(), split.next()) {
				if let Some(next) = map.get(head) {
					resolve_path(next, rest, out);
				}
			}
		}
		Value::Array(items) => {
			for item in items {
				resolve_path(item, path, out);
			}
		}
		_ => {}
	}
}

/// Looks for `path` starting at any object nested up to `depth` levels below `value`.
fn search_property<'a>(value: &'a Value, path: &str, depth: usize, out: &mut Vec<&'a Value>) {
	match value {
		Value::Object(map) => {
			resolve_path(value, path, out);
			if depth == 0 {
				return;
			}
			for nested in map.values() {
				search_property(nested, path, depth - 1, out);
			}
		}
		Value::Array(items) => {
			for item in items {
				search_property(item, path, depth, out);
			}
		}
		_ => {}
	}
}

fn matches_value(value: &Value, constraint: &Constraint, string_match: &StringMatch) -> bool {
	match constraint {
		Constraint::Equals(scalar) => matches_scalar(value, scalar, string_match),
		Constraint::OneOf(scalars) => scalars
			.iter()
			.any(|scalar| matches_scalar(value, scalar, string_match)),
		Constraint::Pattern(patterns) => value_as_text(value)
			.map(|text| patterns.iter().any(|pattern| pattern.is_match(&text)))
			.unwrap_or(false),
		Constraint::Range(range) => matches_range(value, range),
	}
}

fn matches_scalar(value: &Value, scalar: &Scalar, string_match: &StringMatch) -> bool {
	if !string_match.is_exact() {
		let expected = match scalar {
			Scalar::Text(text) => text.clone(),
			Scalar::Number(number) => number.to_string(),
			Scalar::Bool(flag) => flag.to_string(),
		};
		return value_as_text(value)
			.map(|actual| matches_text(&actual, &expected, string_match))
			.unwrap_or(false);
	}

	match scalar {
		Scalar::Bool(expected) => match value {
			Value::Bool(actual) => actual == expected,
			Value::String(actual) => actual.eq_ignore_ascii_case(&expected.to_string()),
			_ => false,
		},
		Scalar::Number(expected) => parse_number(value) == Some(*expected),
		Scalar::Text(expected) => {
			if let (Some(actual), Some(expected)) = (parse_number(value), number_from_str(expected))
			{
				return actual == expected;
			}
			value_as_text(value)
				.map(|actual| actual.to_lowercase() == expected.to_lowercase())
				.unwrap_or(false)
		}
	}
}

/// Every enabled string check must hold; comparisons ignore case.
fn matches_text(actual: &str, expected: &str, string_match: &StringMatch) -> bool {
	let actual_lower = actual.to_lowercase();
	let expected_lower = expected.to_lowercase();

	(!string_match.text || actual_lower.contains(&expected_lower))
		&& (!string_match.word
			|| contains_words(actual, expected, string_match.separator.as_deref()))
		&& (!string_match.start || actual_lower.starts_with(&expected_lower))
		&& (!string_match.end || actual_lower.ends_with(&expected_lower))
}

fn matches_range(value: &Value, range: &RangeConstraint) -> bool {
	if range.is_date_range() {
		let Some(actual) = value.as_str().and_then(parse_date) else {
			return false;
		};
		return within(range, |bound| match bound {
			Bound::Date(date) => Some(actual.cmp(date)),
			Bound::Number(_) => None,
		});
	}

	let Some(actual) = parse_number(value) else {
		return false;
	};
	within(range, |bound| match bound {
		Bound::Number(number) => Some(actual.cmp(number)),
		Bound::Date(_) => None,
	})
}

/// `compare` yields the ordering of the field value relative to a bound.
fn within<F>(range: &RangeConstraint, compare: F) -> bool
where
	F: Fn(&Bound) -> Option<Ordering>,
{
	let lower_ok = range.lower_bounds().all(|(bound, inclusive)| {
		matches!(
			(compare(bound), inclusive),
			(Some(Ordering::Greater), _) | (Some(Ordering::Equal), true)
		)
	});
	let upper_ok = range.upper_bounds().all(|(bound, inclusive)| {
		matches!(
			(compare(bound), inclusive),
			(Some(Ordering::Less), _) | (Some(Ordering::Equal), true)
		)
	});
	lower_ok && upper_ok
}
