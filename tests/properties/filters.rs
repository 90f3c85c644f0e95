use chain_event_engine::services::filter::{matches, parse_filter};
use proptest::{prelude::*, test_runner::Config};
use serde_json::json;

use crate::properties::strategies::{
	equality_filter_strategy, event_strategy, filter_document_strategy, json_strategy,
};

proptest! {
	#![proptest_config(Config {
		failure_persistence: None,
		..Config::default()
	})]

	#[test]
	fn test_parser_never_panics(document in json_strategy()) {
		let _ = parse_filter(&document);
	}

	#[test]
	fn test_empty_filter_matches_any_event(event in event_strategy()) {
		let filter = parse_filter(&json!({})).unwrap();
		prop_assert!(matches(&event, &filter));
	}

	#[test]
	fn test_negation_inverts_primitive_match(
		(field, value) in equality_filter_strategy(),
		event in event_strategy(),
	) {
		let plain = parse_filter(&json!({ field.clone(): value.clone() })).unwrap();
		let negated = parse_filter(&json!({ field.clone(): value.clone(), "_not": true })).unwrap();
		prop_assert_eq!(matches(&event, &negated), !matches(&event, &plain));

		let expected = event.get(&field).and_then(|v| v.as_str()) == Some(value.as_str());
		prop_assert_eq!(matches(&event, &plain), expected);
	}

	#[test]
	fn test_negated_group_inverts_its_filter(
		document in filter_document_strategy(),
		event in event_strategy(),
	) {
		let filter = parse_filter(&document).unwrap();
		let negated = parse_filter(&json!({ "_not": true, "terms": [document] })).unwrap();
		prop_assert_eq!(matches(&event, &negated), !matches(&event, &filter));
	}

	#[test]
	fn test_or_join_matches_when_any_term_does(
		first in equality_filter_strategy(),
		second in equality_filter_strategy(),
		event in event_strategy(),
	) {
		let a = json!({ first.0.clone(): first.1.clone() });
		let b = json!({ second.0.clone(): second.1.clone() });
		let either = parse_filter(&json!({ "_join": "OR", "terms": [a.clone(), b.clone()] })).unwrap();
		let both = parse_filter(&json!({ "terms": [a.clone(), b.clone()] })).unwrap();

		let a = matches(&event, &parse_filter(&a).unwrap());
		let b = matches(&event, &parse_filter(&b).unwrap());
		prop_assert_eq!(matches(&event, &either), a || b);
		prop_assert_eq!(matches(&event, &both), a && b);
	}

	#[test]
	fn test_uint256_amounts_order_like_integers(
		high in 0u64..1_000,
		low in any::<u64>(),
		bound_high in 0u64..1_000,
		bound_low in any::<u64>(),
	) {
		// Amounts of the form high * 10^40 + low are beyond the Decimal range.
		let amount = |high: u64, low: u64| format!("{}{:040}", high, low);
		let value = amount(high, low);
		let bound = amount(bound_high, bound_low);
		let filter = parse_filter(&json!({ "value": { "gte": bound } })).unwrap();
		let event = json!({ "value": value });
		prop_assert_eq!(matches(&event, &filter), (high, low) >= (bound_high, bound_low));
	}

	#[test]
	fn test_inclusive_range_matches_exactly_the_interval(
		value in -10_000i64..10_000,
		low in -10_000i64..10_000,
		span in 0i64..5_000,
	) {
		let high = low + span;
		let filter = parse_filter(&json!({ "value": { "gte": low, "lte": high } })).unwrap();
		let event = json!({ "value": value.to_string() });
		prop_assert_eq!(matches(&event, &filter), low <= value && value <= high);
	}
}
