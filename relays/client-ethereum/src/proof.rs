//! C2: receipt-trie inclusion proof builder.
//!
//! Rebuilds the block's receipt trie from its full ordered receipt list,
//! checks the computed root against the block's advertised `receipt_hash`,
//! then walks the trie for the target transaction index and records every
//! node touched on the lookup path. Mirrors `MakeMessageFromEvent` in the
//! original source, which does the same rebuild-then-walk once per block
//! and reuses the trie for every log in that block.

use std::sync::Arc;

use cita_trie::{MemoryDB, PatriciaTrie, Trie};
use hasher::{Hasher, HasherKeccak};
use relay_types::MptProofSet;
use rlp::RlpStream;

use crate::error::Error;

/// A receipt trie rebuilt for one block, reused across every log in that
/// block rather than rebuilt per log.
pub struct ReceiptTrie {
	trie: PatriciaTrie<MemoryDB, HasherKeccak>,
	hasher: Arc<HasherKeccak>,
	len: usize,
}

impl ReceiptTrie {
	/// `receipts` must be in transaction-index order. `expected_root` is the
	/// block's advertised `receipt_hash`.
	pub fn build(receipts: &[Vec<u8>], expected_root: &[u8]) -> Result<Self, Error> {
		let hasher = Arc::new(HasherKeccak::new());
		let memdb = Arc::new(MemoryDB::new(true));
		let mut trie = PatriciaTrie::new(memdb, hasher.clone());

		for (index, receipt) in receipts.iter().enumerate() {
			let key = rlp_index(index);
			trie.insert(key, receipt.clone())
				.map_err(|err| Error::Encoding(format!("{err:?}")))?;
		}

		let root = trie.root().map_err(|err| Error::Encoding(format!("{err:?}")))?;
		if root.as_slice() != expected_root {
			return Err(Error::ProofMismatch {
				receipts: receipts.len(),
				actual: hex::encode(&root),
				expected: hex::encode(expected_root),
			});
		}

		Ok(ReceiptTrie { trie, hasher, len: receipts.len() })
	}

	pub fn len(&self) -> usize {
		self.len
	}

	pub fn is_empty(&self) -> bool {
		self.len == 0
	}

	/// Produces the witness path for `tx_index`: every trie node visited
	/// while looking it up, keyed by `Keccak256(node_bytes)` to match the
	/// `MptProofSet` `KeyValueReader` shape.
	pub fn prove(&mut self, tx_index: u32) -> Result<MptProofSet, Error> {
		let key = rlp_index(tx_index as usize);
		let nodes = self
			.trie
			.get_proof(&key)
			.map_err(|err| Error::Encoding(format!("{err:?}")))?;

		let mut proof = MptProofSet::new();
		for node in nodes {
			let node_hash = self.hasher.digest(&node);
			proof.push(node_hash, node);
		}
		Ok(proof)
	}
}

fn rlp_index(index: usize) -> Vec<u8> {
	let mut stream = RlpStream::new();
	stream.append(&(index as u64));
	stream.out().to_vec()
}

#[cfg(test)]
mod tests {
	use super::*;

	fn receipt(tag: u8, len: usize) -> Vec<u8> {
		let mut stream = RlpStream::new();
		stream.append(&vec![tag; len]);
		stream.out().to_vec()
	}

	#[test]
	fn proof_verifies_against_the_block_root() {
		let receipts = vec![receipt(1, 8), receipt(2, 40), receipt(3, 12), receipt(4, 64)];

		let hasher = HasherKeccak::new();
		let memdb = Arc::new(MemoryDB::new(true));
		let mut scratch = PatriciaTrie::new(memdb, Arc::new(HasherKeccak::new()));
		for (index, receipt) in receipts.iter().enumerate() {
			scratch.insert(rlp_index(index), receipt.clone()).unwrap();
		}
		let root = scratch.root().unwrap();
		let _ = hasher;

		let mut built = ReceiptTrie::build(&receipts, &root).expect("root matches");
		assert_eq!(built.len(), receipts.len());

		let proof = built.prove(2).expect("proof for tx index 2");
		assert!(!proof.is_empty());
		for (key, value) in proof.keys.iter().zip(proof.values.iter()) {
			assert_eq!(key, &HasherKeccak::new().digest(value));
		}
	}

	#[test]
	fn stale_receipts_are_rejected_with_proof_mismatch() {
		let receipts = vec![receipt(1, 8), receipt(2, 40)];
		let wrong_root = [0u8; 32];
		let err = ReceiptTrie::build(&receipts, &wrong_root).unwrap_err();
		assert!(matches!(err, Error::ProofMismatch { .. }));
	}
}
