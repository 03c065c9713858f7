use relay_utils::{Classify, ErrorClass};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
	#[error("RPC call to Substrate node failed: {0}")]
	Rpc(#[from] jsonrpsee::core::ClientError),

	#[error("Substrate node returned a malformed response: {0}")]
	Decode(String),

	#[error("extrinsic pool reached its {max_watched} watcher capacity")]
	PoolAtCapacity { max_watched: usize },

	#[error("signing the extrinsic failed: {0}")]
	Signing(String),

	#[error("channel closed while draining a payload")]
	ChannelClosed,

	#[error("relayer was cancelled")]
	Cancelled,
}

impl Classify for Error {
	fn class(&self) -> ErrorClass {
		match self {
			Error::Rpc(_) => ErrorClass::Transient,
			Error::Decode(_) | Error::PoolAtCapacity { .. } => ErrorClass::Logical,
			Error::Signing(_) | Error::ChannelClosed | Error::Cancelled => ErrorClass::Fatal,
		}
	}
}
