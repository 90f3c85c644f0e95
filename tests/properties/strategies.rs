use chain_event_engine::models::{
	ContractCall, Network, SimDetails, SimulationTransactionOutput, Status, System,
};
use proptest::{option, prelude::*};
use serde_json::{json, Map, Value};

const MAX_COLLECTION_SIZE: usize = 6;

pub const FIELDS: [&str; 4] = ["status", "from", "to", "asset"];

/// Arbitrary JSON of bounded depth
pub fn json_strategy() -> impl Strategy<Value = Value> {
	let leaf = prop_oneof![
		Just(Value::Null),
		any::<bool>().prop_map(Value::Bool),
		any::<i64>().prop_map(|n| json!(n)),
		"[a-zA-Z0-9_ ]{0,12}".prop_map(Value::String),
		"_[a-zA-Z]{1,12}".prop_map(Value::String),
	];
	leaf.prop_recursive(3, 24, MAX_COLLECTION_SIZE as u32, |inner| {
		prop_oneof![
			prop::collection::vec(inner.clone(), 0..MAX_COLLECTION_SIZE).prop_map(Value::Array),
			prop::collection::btree_map(
				prop_oneof![
					"[a-z]{1,8}".prop_map(|s| s.to_string()),
					prop::sample::select(vec![
						"_not", "_join", "_text", "_word", "_regexp", "_separator",
						"_propertySearch", "_propertySearchDepth", "terms", "gte", "lt",
					])
					.prop_map(|s| s.to_string()),
				],
				inner,
				0..MAX_COLLECTION_SIZE,
			)
			.prop_map(|entries| Value::Object(entries.into_iter().collect())),
		]
	})
}

/// Small vocabulary so generated filters and events actually collide
pub fn field_value_strategy() -> impl Strategy<Value = String> {
	prop::sample::select(vec!["pending", "confirmed", "0xabc", "0xdef", "eth", "dai"])
		.prop_map(|s| s.to_string())
}

/// Flat event record over [`FIELDS`], each field possibly missing
pub fn event_strategy() -> impl Strategy<Value = Value> {
	prop::collection::vec(option::of(field_value_strategy()), FIELDS.len()).prop_map(|values| {
		let mut record = Map::new();
		for (field, value) in FIELDS.iter().zip(values) {
			if let Some(value) = value {
				record.insert(field.to_string(), Value::String(value));
			}
		}
		Value::Object(record)
	})
}

/// Equality filter document on one of [`FIELDS`]
pub fn equality_filter_strategy() -> impl Strategy<Value = (String, String)> {
	(prop::sample::select(FIELDS.to_vec()), field_value_strategy())
		.prop_map(|(field, value)| (field.to_string(), value))
}

/// Well-formed filter documents: equality leaves, possibly negated, nested
/// in AND/OR groups that may be negated themselves
pub fn filter_document_strategy() -> impl Strategy<Value = Value> {
	let leaf = (equality_filter_strategy(), any::<bool>()).prop_map(|((field, value), not)| {
		let mut node = Map::new();
		node.insert(field, Value::String(value));
		if not {
			node.insert("_not".to_string(), Value::Bool(true));
		}
		Value::Object(node)
	});
	leaf.prop_recursive(3, 16, 4, |inner| {
		(
			prop::collection::vec(inner, 0..4),
			prop::sample::select(vec!["AND", "OR"]),
			any::<bool>(),
		)
			.prop_map(|(terms, join, not)| json!({ "terms": terms, "_join": join, "_not": not }))
	})
}

pub fn simulation_output_strategy() -> impl Strategy<Value = SimulationTransactionOutput> {
	(
		0u64..1_000_000,
		0u64..100_000,
		0u64..5_000,
		option::weighted(0.3, "[a-z ]{1,20}"),
		"[a-zA-Z]{1,12}",
	)
		.prop_map(|(gas_used, block, e2e_ms, error, method_name)| SimulationTransactionOutput {
			id: None,
			from: "0xfrom".to_string(),
			to: "0xto".to_string(),
			value: 0.0,
			gas: gas_used * 2,
			gas_price: "1".to_string(),
			input: "0x".to_string(),
			kind: 2,
			gas_used,
			internal_transactions: None,
			net_balance_changes: None,
			server_version: "1.0.0".to_string(),
			simulated_block_number: block,
			sim_details: SimDetails {
				block_number: block,
				e2e_ms,
				performance_profile: Value::Null,
			},
			status: if error.is_some() {
				Status::Failed
			} else {
				Status::Simulated
			},
			system: System::Ethereum,
			network: Network::Main,
			error: error.map(Value::String),
			contract_call: ContractCall {
				method_name,
				..ContractCall::default()
			},
		})
}
