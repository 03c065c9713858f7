//! C7: backward-search catch-up. Reconstructs commitments the parachain
//! has emitted but the Ethereum side has not yet ingested, by walking
//! parachain blocks backward from the relay chain's latest BEEFY-verified
//! head until both channels' on-chain nonces are accounted for.

use codec::Decode;
use relay_types::{
	AuxiliaryDigestItem, BasicOutboundChannelMessage, ChannelId, DigestItemWithData,
	IncentivizedOutboundChannelMessage, OutboundChannelMessage, ParaBlockWithDigest, H256,
};

use crate::connection::ParachainRpc;
use crate::error::Error;

/// Current on-chain nonce for each channel, read once up front. Kept as a
/// named struct (rather than two loose `u64` locals) so the basic/
/// incentivized branches of the backward search cannot be cross-assigned —
/// a naive implementation of this search can reset the wrong local
/// (`paraBasicNonce`) in the incentivized "not found" branch; a single
/// generic accessor per channel makes that copy-paste class of bug
/// unrepresentable here.
#[derive(Clone, Copy, Debug)]
pub struct ChannelNonces {
	pub basic: u64,
	pub incentivized: u64,
}

impl ChannelNonces {
	pub fn get(&self, channel_id: ChannelId) -> u64 {
		match channel_id {
			ChannelId::Basic => self.basic,
			ChannelId::Incentivized => self.incentivized,
		}
	}
}

/// Reads both channels' nonces at `at_block_hash` through one shared
/// helper, so the two call sites can never be transposed.
pub async fn read_para_nonces(
	rpc: &impl ParachainRpc,
	at_block_hash: H256,
) -> Result<ChannelNonces, Error> {
	let basic = rpc.para_nonce(ChannelId::Basic, at_block_hash).await?;
	let incentivized = rpc.para_nonce(ChannelId::Incentivized, at_block_hash).await?;
	Ok(ChannelNonces { basic, incentivized })
}

/// Runs the backward search. Returns parachain blocks in ascending order,
/// each carrying only the commitments still outstanding on the Ethereum
/// side. Empty if `eth_nonces == para_nonces` for both channels already.
pub async fn search_for_lost_commitments(
	rpc: &impl ParachainRpc,
	eth_nonces: ChannelNonces,
	para_nonces: ChannelNonces,
	verified_para_block_number: u64,
) -> Result<Vec<ParaBlockWithDigest>, Error> {
	let mut basic_found = eth_nonces.basic >= para_nonces.basic;
	let mut incentivized_found = eth_nonces.incentivized >= para_nonces.incentivized;

	if basic_found && incentivized_found {
		return Ok(Vec::new());
	}

	let mut blocks_descending = Vec::new();
	let mut block_number = verified_para_block_number;

	loop {
		let commitments = rpc.commitments_at(block_number).await?;
		let mut digest_items_with_data = Vec::new();

		for digest_item in commitments {
			let AuxiliaryDigestItem::Commitment { channel_id, hash } = digest_item;
			let nonce_to_find = eth_nonces.get(channel_id);
			let already_found = match channel_id {
				ChannelId::Basic => basic_found,
				ChannelId::Incentivized => incentivized_found,
			};
			if already_found {
				continue;
			}

			let blob = rpc.offchain_commitment(hash).await?;
			let delivered = commitment_covers_nonce(channel_id, &blob, nonce_to_find)?;

			if delivered {
				match channel_id {
					ChannelId::Basic => basic_found = true,
					ChannelId::Incentivized => incentivized_found = true,
				}
				continue;
			}

			digest_items_with_data.push(DigestItemWithData {
				digest_item: AuxiliaryDigestItem::Commitment { channel_id, hash },
				data: blob,
			});
		}

		blocks_descending.push(ParaBlockWithDigest { block_number, digest_items_with_data });

		if (basic_found && incentivized_found) || block_number == 0 {
			break;
		}
		block_number -= 1;
	}

	blocks_descending.reverse();
	Ok(blocks_descending)
}

/// Decodes the off-chain commitment blob for `channel_id` and reports
/// whether it contains a message with `nonce <= nonce_to_find` — meaning
/// this commitment (and everything before it) has already been delivered.
fn commitment_covers_nonce(
	channel_id: ChannelId,
	blob: &[u8],
	nonce_to_find: u64,
) -> Result<bool, Error> {
	match channel_id {
		ChannelId::Basic => {
			let messages = Vec::<BasicOutboundChannelMessage>::decode(&mut &blob[..])
				.map_err(|err| Error::Decode(format!("basic commitment: {err}")))?;
			Ok(messages.iter().any(|m| m.nonce() <= nonce_to_find))
		}
		ChannelId::Incentivized => {
			let messages = Vec::<IncentivizedOutboundChannelMessage>::decode(&mut &blob[..])
				.map_err(|err| Error::Decode(format!("incentivized commitment: {err}")))?;
			Ok(messages.iter().any(|m| m.nonce() <= nonce_to_find))
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use codec::Encode;
	use relay_types::H256;
	use std::collections::HashMap;
	use std::sync::Mutex;

	struct FakeParachain {
		/// block_number -> commitments present in that block's digest.
		digests: HashMap<u64, Vec<AuxiliaryDigestItem>>,
		/// commitment hash -> encoded blob.
		blobs: HashMap<H256, Vec<u8>>,
		calls: Mutex<Vec<u64>>,
	}

	#[async_trait]
	impl ParachainRpc for FakeParachain {
		async fn commitments_at(&self, block_number: u64) -> Result<Vec<AuxiliaryDigestItem>, Error> {
			self.calls.lock().unwrap().push(block_number);
			Ok(self.digests.get(&block_number).cloned().unwrap_or_default())
		}

		async fn offchain_commitment(&self, commitment_hash: H256) -> Result<Vec<u8>, Error> {
			self.blobs
				.get(&commitment_hash)
				.cloned()
				.ok_or_else(|| Error::Decode("missing blob".into()))
		}

		async fn para_nonce(&self, _channel_id: ChannelId, _at_block_hash: H256) -> Result<u64, Error> {
			Ok(0)
		}

		async fn block_hash(&self, block_number: u64) -> Result<H256, Error> {
			Ok(H256::from_low_u64_be(block_number))
		}

		async fn encoded_header(&self, _block_number: u64) -> Result<Vec<u8>, Error> {
			Ok(Vec::new())
		}
	}

	fn basic_commitment(nonce: u64) -> Vec<u8> {
		vec![BasicOutboundChannelMessage { nonce, target: Default::default(), payload: vec![] }]
			.encode()
	}

	#[async_std::test]
	async fn stops_as_soon_as_a_delivered_nonce_is_found() {
		let commitment_hash_2 = H256::repeat_byte(2);
		let commitment_hash_1 = H256::repeat_byte(1);

		let mut digests = HashMap::new();
		digests.insert(
			3,
			vec![AuxiliaryDigestItem::Commitment { channel_id: ChannelId::Basic, hash: commitment_hash_2 }],
		);
		digests.insert(
			2,
			vec![AuxiliaryDigestItem::Commitment { channel_id: ChannelId::Basic, hash: commitment_hash_1 }],
		);

		let mut blobs = HashMap::new();
		blobs.insert(commitment_hash_2, basic_commitment(5));
		blobs.insert(commitment_hash_1, basic_commitment(3));

		let rpc =
			FakeParachain { digests, blobs, calls: Mutex::new(Vec::new()) };

		let blocks = search_for_lost_commitments(
			&rpc,
			ChannelNonces { basic: 3, incentivized: 0 },
			ChannelNonces { basic: 5, incentivized: 0 },
			3,
		)
		.await
		.unwrap();

		// Block 3's commitment (nonce 5) is still outstanding; block 2's
		// commitment (nonce 3) matches `eth_nonces.basic` and marks the
		// channel found, so the search stops there without walking to 0.
		assert_eq!(blocks.len(), 2);
		assert_eq!(blocks[0].block_number, 2);
		assert!(blocks[0].digest_items_with_data.is_empty());
		assert_eq!(blocks[1].block_number, 3);
		assert_eq!(blocks[1].digest_items_with_data.len(), 1);
	}

	#[async_std::test]
	async fn equal_nonces_short_circuit_to_an_empty_result() {
		let rpc = FakeParachain {
			digests: HashMap::new(),
			blobs: HashMap::new(),
			calls: Mutex::new(Vec::new()),
		};
		let nonces = ChannelNonces { basic: 7, incentivized: 9 };
		let blocks = search_for_lost_commitments(&rpc, nonces, nonces, 100).await.unwrap();
		assert!(blocks.is_empty());
		assert!(rpc.calls.lock().unwrap().is_empty());
	}
}
