use crate::H256;
use codec::{Decode, Encode};
use scale_info::TypeInfo;

/// An Ethereum outbound message: a 20-byte application id plus a payload
/// that proves (one way or another) the message was emitted.
///
/// Exactly one `MessagePayload` variant is ever populated; the variant tag
/// travels on the wire as the enum discriminant.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode, TypeInfo)]
pub struct Message {
	pub app_id: [u8; 20],
	pub payload: MessagePayload,
}

#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode, TypeInfo)]
pub enum MessagePayload {
	/// Cheap descriptor used when the destination trusts the basic channel's
	/// ordering guarantees without an inclusion proof.
	Basic { block_number: u64, event_index: u32 },
	/// Self-contained receipt-trie inclusion proof, used by the incentivized
	/// channel so the destination light client can verify the message
	/// without trusting the relayer.
	ReceiptProof(ReceiptProof),
}

#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode, TypeInfo)]
pub struct ReceiptProof {
	pub block_hash: H256,
	pub tx_index: u32,
	pub proof: MptProofSet,
}

/// An ordered pair of equal-length key/value sequences describing every
/// trie node visited while proving inclusion of one receipt. Order is
/// irrelevant and duplicate `node_hash` keys are tolerated;
/// lookups are by key equality, not by position.
#[derive(Clone, Debug, Default, PartialEq, Eq, Encode, Decode, TypeInfo)]
pub struct MptProofSet {
	pub keys: Vec<Vec<u8>>,
	pub values: Vec<Vec<u8>>,
}

impl MptProofSet {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn push(&mut self, key: Vec<u8>, value: Vec<u8>) {
		self.keys.push(key);
		self.values.push(value);
	}

	pub fn len(&self) -> usize {
		self.keys.len()
	}

	pub fn is_empty(&self) -> bool {
		self.keys.is_empty()
	}

	/// Read-only key/value view used by the trie proof verifier
	/// (`trie_db::Recorder`/`hash_db::HashDB` consumers look values up by
	/// node hash; a flat linear scan is fine here since proofs are small.
	pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
		self.keys
			.iter()
			.position(|k| k.as_slice() == key)
			.map(|i| self.values[i].as_slice())
	}

	pub fn contains(&self, key: &[u8]) -> bool {
		self.get(key).is_some()
	}
}
