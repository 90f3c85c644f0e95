//! Argument checks for the caller surface.

use crate::models::{SdkError, System};

fn is_hex(value: &str) -> bool {
	value.chars().all(|c| c.is_ascii_hexdigit())
}

/// Checks that `hash` is a transaction hash (Ethereum) or txid (Bitcoin).
pub fn validate_transaction_hash(system: System, hash: &str) -> Result<(), SdkError> {
	let valid = match system {
		System::Ethereum => hash
			.strip_prefix("0x")
			.is_some_and(|body| body.len() == 64 && is_hex(body)),
		System::Bitcoin => hash.len() == 64 && is_hex(hash),
	};
	if valid {
		Ok(())
	} else {
		Err(SdkError::new(format!("Invalid {} transaction hash", system)).for_transaction(hash))
	}
}

/// Checks that `address` looks like an account address of `system`.
pub fn validate_address(system: System, address: &str) -> Result<(), SdkError> {
	let valid = match system {
		System::Ethereum => address
			.strip_prefix("0x")
			.is_some_and(|body| body.len() == 40 && is_hex(body)),
		System::Bitcoin => {
			(26..=90).contains(&address.len()) && address.chars().all(|c| c.is_ascii_alphanumeric())
		}
	};
	if valid {
		Ok(())
	} else {
		Err(SdkError::new(format!("Invalid {} address", system)).for_account(address))
	}
}
