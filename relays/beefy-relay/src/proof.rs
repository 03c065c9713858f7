//! C8: MMR leaf and parachain-head prover. `build_para_head_proof`
//! constructs a binary Merkle proof that our parachain's head is the leaf
//! at some index among all sibling paraheads included in a relay block,
//! using the same tree shape the runtime itself builds the root with
//! (`substrate/utils/binary-merkle-tree`, consumed on-chain by
//! `pallet-beefy-mmr` for exactly this leaf).

use binary_merkle_tree::{merkle_proof, verify_proof};
use codec::Encode;
use relay_types::{ParaHeadProof, H256};
use sp_runtime::traits::Keccak256;

use crate::connection::ParaHeadsAtRelayBlock;
use crate::error::Error;

/// Builds the proof and verifies it against `expected_root` (the MMR
/// leaf's advertised `parachain_heads` field) before returning, so a
/// caller never ships an unverifiable proof.
pub fn build_para_head_proof(
	heads: &ParaHeadsAtRelayBlock,
	expected_root: H256,
) -> Result<ParaHeadProof, Error> {
	let mut sorted = heads.all_heads.clone();
	sorted.sort_by_key(|head| head.para_id);

	let leaf_index = sorted
		.iter()
		.position(|head| head.para_id == heads.our_para_id)
		.ok_or(Error::ProofRootMismatch)?;

	let leaves: Vec<Vec<u8>> =
		sorted.iter().map(|head| (head.para_id, head.head_data.clone()).encode()).collect();

	let proof = merkle_proof::<Keccak256, _, _>(leaves.iter(), leaf_index);

	if proof.root != expected_root {
		return Err(Error::ProofRootMismatch);
	}

	let verified = verify_proof::<Keccak256, _, _>(
		&proof.root,
		proof.proof.clone(),
		proof.number_of_leaves,
		proof.leaf_index,
		&proof.leaf,
	);
	if !verified {
		return Err(Error::ProofRootMismatch);
	}

	Ok(ParaHeadProof {
		proof: proof.proof,
		number_of_leaves: proof.number_of_leaves as u32,
		leaf_index: proof.leaf_index as u32,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::connection::ParaHead;
	use binary_merkle_tree::merkle_root;

	fn heads() -> Vec<ParaHead> {
		vec![
			ParaHead { para_id: 100, number: 10, head_data: vec![1, 2, 3] },
			ParaHead { para_id: 200, number: 11, head_data: vec![4, 5, 6] },
			ParaHead { para_id: 300, number: 12, head_data: vec![7, 8, 9] },
		]
	}

	#[test]
	fn proof_verifies_against_the_real_root() {
		let heads = heads();
		let leaves: Vec<Vec<u8>> =
			heads.iter().map(|head| (head.para_id, head.head_data.clone()).encode()).collect();
		let root = merkle_root::<Keccak256, _>(leaves.iter());

		let at_relay_block = ParaHeadsAtRelayBlock { all_heads: heads, our_para_id: 200 };
		let proof = build_para_head_proof(&at_relay_block, root).expect("proof builds");
		assert_eq!(proof.number_of_leaves, 3);
	}

	#[test]
	fn mismatched_root_is_rejected() {
		let at_relay_block = ParaHeadsAtRelayBlock { all_heads: heads(), our_para_id: 200 };
		let err = build_para_head_proof(&at_relay_block, H256::repeat_byte(0xAB)).unwrap_err();
		assert!(matches!(err, Error::ProofRootMismatch));
	}
}
