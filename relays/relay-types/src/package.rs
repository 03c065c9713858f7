use crate::{AuxiliaryDigestItem, ChannelId, MmrLeafProof, ParaHeadProof, H256};
use codec::{Decode, Encode};
use scale_info::TypeInfo;

/// A single commitment digest item found in a parachain block, together
/// with the commitment blob fetched from off-chain indexed storage.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode, TypeInfo)]
pub struct DigestItemWithData {
	pub digest_item: AuxiliaryDigestItem,
	pub data: Vec<u8>,
}

/// A parachain block and the (possibly empty) set of not-yet-relayed
/// commitments found in its digest.
#[derive(Clone, Debug, Default, PartialEq, Eq, Encode, Decode, TypeInfo)]
pub struct ParaBlockWithDigest {
	pub block_number: u64,
	pub digest_items_with_data: Vec<DigestItemWithData>,
}

/// [`ParaBlockWithDigest`] augmented with the MMR leaf and parachain-head
/// proofs needed to submit its commitments to Ethereum.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode, TypeInfo)]
pub struct ParaBlockWithProofs {
	pub block: ParaBlockWithDigest,
	pub mmr_proof: MmrLeafProof,
	/// SCALE-encoded parachain header.
	pub para_header: Vec<u8>,
	pub para_head_proof: ParaHeadProof,
}

/// The unit of work emitted to the Ethereum-side submitter: one commitment,
/// plus everything needed to prove it against the Ethereum light client's
/// verified relay-chain head.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode, TypeInfo)]
pub struct MessagePackage {
	pub channel_id: ChannelId,
	pub commitment_hash: H256,
	pub commitment_data: Vec<u8>,
	pub para_head: Vec<u8>,
	pub para_head_proof: ParaHeadProof,
	pub mmr_proof: MmrLeafProof,
}
