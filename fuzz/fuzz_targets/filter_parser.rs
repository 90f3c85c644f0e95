#![no_main]

use chain_event_engine::services::filter::{matches, parse_filter};
use libfuzzer_sys::fuzz_target;
use serde_json::{json, Value};

fuzz_target!(|data: &[u8]| {
	let Ok(document) = serde_json::from_slice::<Value>(data) else {
		return;
	};
	if let Ok(filter) = parse_filter(&document) {
		let event = json!({
			"status": "pending",
			"value": "1500",
			"from": "0xabc0000000000000000000000000000000000001",
			"contractCall": { "methodName": "transfer", "params": { "amount": "10" } },
			"internalTransactions": [{ "to": "0xccc", "value": "1" }]
		});
		let _ = matches(&event, &filter);
		let _ = matches(&document, &filter);
	}
});
