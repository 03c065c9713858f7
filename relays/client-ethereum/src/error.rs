use relay_utils::{Classify, ErrorClass};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
	#[error("RPC call to Ethereum node failed: {0}")]
	Rpc(#[from] jsonrpsee::core::ClientError),

	#[error("Ethereum node returned a malformed response: {0}")]
	Decode(String),

	#[error("receipt trie rebuilt from {receipts} receipts has root {actual}, expected {expected} (stale or reorged receipts)")]
	ProofMismatch { receipts: usize, actual: String, expected: String },

	#[error("failed to RLP-encode or build the receipt trie: {0}")]
	Encoding(String),

	#[error("channel closed while emitting a block batch")]
	ChannelClosed,

	#[error("relayer was cancelled")]
	Cancelled,
}

impl Classify for Error {
	fn class(&self) -> ErrorClass {
		match self {
			Error::Rpc(_) => ErrorClass::Transient,
			Error::Decode(_) | Error::ProofMismatch { .. } | Error::Encoding(_) => {
				ErrorClass::Logical
			}
			Error::ChannelClosed | Error::Cancelled => ErrorClass::Fatal,
		}
	}
}
