//! Chain identification types.
//!
//! A subscription is always scoped to a chain. The engine keys its indices by
//! [`ChainId`], which is derived from a `(System, Network)` pair.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Blockchain family an event belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum System {
	#[default]
	Ethereum,
	Bitcoin,
}

/// Network within a [`System`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Network {
	#[default]
	Main,
	Goerli,
	Xdai,
	MaticMain,
	MaticMumbai,
	Local,
	Testnet,
}

impl Network {
	/// Returns the chain identifier for this network on the given system.
	pub fn chain_id(&self, system: System) -> ChainId {
		let id = match (system, self) {
			(System::Ethereum, Network::Main) => "0x1",
			(System::Ethereum, Network::Goerli) => "0x5",
			(System::Ethereum, Network::Xdai) => "0x64",
			(System::Ethereum, Network::MaticMain) => "0x89",
			(System::Ethereum, Network::MaticMumbai) => "0x13881",
			(System::Ethereum, Network::Local) => "0x539",
			(System::Ethereum, Network::Testnet) => "0x5",
			(System::Bitcoin, Network::Testnet) | (System::Bitcoin, Network::Goerli) => {
				"bitcoin-testnet"
			}
			(System::Bitcoin, Network::Local) => "bitcoin-local",
			(System::Bitcoin, _) => "bitcoin-main",
		};
		ChainId(id.to_string())
	}

	/// Resolves a network from an EVM network id (as configured by callers).
	pub fn from_network_id(network_id: u64) -> Option<Self> {
		match network_id {
			1 => Some(Network::Main),
			5 => Some(Network::Goerli),
			100 => Some(Network::Xdai),
			137 => Some(Network::MaticMain),
			80001 => Some(Network::MaticMumbai),
			1337 => Some(Network::Local),
			_ => None,
		}
	}
}

impl fmt::Display for Network {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Network::Main => "main",
			Network::Goerli => "goerli",
			Network::Xdai => "xdai",
			Network::MaticMain => "matic-main",
			Network::MaticMumbai => "matic-mumbai",
			Network::Local => "local",
			Network::Testnet => "testnet",
		};
		write!(f, "{}", name)
	}
}

impl fmt::Display for System {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			System::Ethereum => write!(f, "ethereum"),
			System::Bitcoin => write!(f, "bitcoin"),
		}
	}
}

/// Chain identifier (hex encoded for EVM networks)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(pub String);

impl ChainId {
	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into().to_lowercase())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for ChainId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// `system` / `network` pair as it appears in server messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Blockchain {
	pub system: System,
	pub network: Network,
}

impl Blockchain {
	pub fn new(system: System, network: Network) -> Self {
		Self { system, network }
	}

	pub fn chain_id(&self) -> ChainId {
		self.network.chain_id(self.system)
	}
}
