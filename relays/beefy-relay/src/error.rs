use relay_utils::{Classify, ErrorClass};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
	#[error("RPC call while searching for lost commitments failed: {0}")]
	Rpc(#[from] jsonrpsee::core::ClientError),

	#[error("failed to decode a digest item, commitment blob or storage value: {0}")]
	Decode(String),

	#[error("reconstructed parachain-head proof root does not match the MMR leaf's advertised root")]
	ProofRootMismatch,

	#[error("channel closed while emitting a message package")]
	ChannelClosed,
}

impl Classify for Error {
	fn class(&self) -> ErrorClass {
		match self {
			Error::Rpc(_) => ErrorClass::Transient,
			Error::Decode(_) | Error::ProofRootMismatch => ErrorClass::Logical,
			Error::ChannelClosed => ErrorClass::Fatal,
		}
	}
}
