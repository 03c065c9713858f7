use crate::H256;
use codec::{Decode, Encode};
use scale_info::TypeInfo;

/// Merkle proof that our parachain's head is the leaf at `leaf_index` among
/// `number_of_leaves` sibling paraheads, rooted at the `parachain_heads`
/// field of an MMR leaf. Carries the same shape as
/// `binary_merkle_tree::MerkleProof` but without generic parameters, so it
/// can travel across the relayer's channels without every crate depending
/// on the on-chain proof-construction machinery.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode, TypeInfo)]
pub struct ParaHeadProof {
	pub proof: Vec<H256>,
	pub number_of_leaves: u32,
	pub leaf_index: u32,
}

/// MMR leaf plus inclusion proof for a given relay-chain block, as returned
/// by `mmr_generateProof` and consumed by the Ethereum light client.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode, TypeInfo)]
pub struct MmrLeafProof {
	pub block_hash: H256,
	/// SCALE-encoded `sp_mmr_primitives::EncodableOpaqueLeaf`.
	pub leaf: Vec<u8>,
	/// Sibling hashes proving `leaf`'s inclusion in the MMR root.
	pub items: Vec<H256>,
}
