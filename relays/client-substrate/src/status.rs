//! Subset of `author_submitAndWatchExtrinsic`'s `TransactionStatus` that
//! the pool's status handling (§4.4) distinguishes between. Variants not
//! named here are folded into [`TransactionStatus::OtherTerminal`] by the
//! connection layer, matching the spec's "any other ... treat as terminal
//! success" catch-all.

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransactionStatus {
	Ready,
	Future,
	Broadcast,
	Dropped,
	Invalid,
	/// `InBlock`, `Finalized`, `Usurped`, `Retracted`, `FinalityTimeout`, and
	/// anything else the node reports: the nonce was consumed on-chain one
	/// way or another.
	OtherTerminal,
}

impl TransactionStatus {
	pub fn from_rpc_tag(tag: &str) -> Self {
		match tag {
			"ready" => TransactionStatus::Ready,
			"future" => TransactionStatus::Future,
			"broadcast" => TransactionStatus::Broadcast,
			"dropped" => TransactionStatus::Dropped,
			"invalid" => TransactionStatus::Invalid,
			_ => TransactionStatus::OtherTerminal,
		}
	}
}
