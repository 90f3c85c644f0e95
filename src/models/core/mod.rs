//! Core domain models shared by every engine component.

mod chain;
mod error;
mod event;
mod notification;
mod simulation;
mod status;
mod subscription;
mod transaction;

pub use chain::{Blockchain, ChainId, Network, System};
pub use error::SdkError;
pub use event::{
	AccountEventObject, AccountRef, Balance, BaseEventObject, BaseTransactionEventObject,
	ConfigEventObject, ContractEventObject, ContractInvocation, EventObject,
	InitializeEventObject, OutboundMessage, ServerEvent, ServerMessage, ServerStatus,
	TransactionEventBody, TransactionEventObject, WalletEventObject,
};
pub use notification::{
	EmitterResult, NotificationDecision, NotificationObject, NotificationType, TransactionEvent,
};
pub use simulation::{
	MultiSimContractCallData, MultiSimOutput, SimDetails, SimulationTransaction,
	SimulationTransactionOutput,
};
pub use status::{Status, TransactionEventCode};
pub use subscription::{Config, Subscription};
pub use transaction::{
	Asset, BalanceChange, BitcoinRawTransaction, BitcoinTransactionData, BitcoinTransactionLog,
	BreakDown, CommonTransactionData, ContractCall, EmitterPayload, EthereumTransactionData,
	EthereumTransactionLog, InputOutput, InternalTransaction, NetBalanceChange, ScriptPubKey,
	ScriptSig, TransactionData, TransactionEventLog, Vin, Vout,
};
