use crate::models::{Blockchain, OutboundMessage};

/// Identity fields stamped on every outbound message
#[derive(Debug, Clone, PartialEq)]
pub struct MessageStamp {
	pub dapp_id: Option<String>,
	pub version: String,
	pub app_name: Option<String>,
	pub app_version: Option<String>,
	pub blockchain: Blockchain,
}

impl MessageStamp {
	/// Fills in the identity fields, keeping a blockchain the message already names.
	pub fn apply(&self, mut message: OutboundMessage) -> OutboundMessage {
		message.dapp_id = self.dapp_id.clone();
		message.version = Some(self.version.clone());
		message.app_name = self.app_name.clone();
		message.app_version = self.app_version.clone();
		if message.blockchain.is_none() {
			message.blockchain = Some(self.blockchain);
		}
		message
	}
}
