//! C7 (listener half) + package emission. Re-runs the catch-up check on a
//! fixed poll interval and whenever the Ethereum light client observes a
//! newly-verified BEEFY block, merging both trigger sources into one
//! `futures::stream::select` rather than two independently-polled loops.

use std::sync::Arc;
use std::time::Duration;

use async_std::channel::Sender;
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use relay_types::{ChannelId, MessagePackage, ParaBlockWithDigest, ParaBlockWithProofs, H256};
use relay_utils::CancellationToken;

use crate::catchup::{read_para_nonces, search_for_lost_commitments, ChannelNonces};
use crate::connection::{EthLightClientRpc, ParaHeadsAtRelayBlock, ParachainRpc, RelayChainRpc};
use crate::error::Error;
use crate::proof::build_para_head_proof;

pub struct BeefyListener<P, R, E> {
	parachain: Arc<P>,
	relay_chain: Arc<R>,
	eth: Arc<E>,
	poll_interval: Duration,
	packages: Sender<MessagePackage>,
}

impl<P, R, E> BeefyListener<P, R, E>
where
	P: ParachainRpc + 'static,
	R: RelayChainRpc + 'static,
	E: EthLightClientRpc + 'static,
{
	pub fn new(
		parachain: Arc<P>,
		relay_chain: Arc<R>,
		eth: Arc<E>,
		poll_interval: Duration,
		packages: Sender<MessagePackage>,
	) -> Self {
		BeefyListener { parachain, relay_chain, eth, poll_interval, packages }
	}

	/// `beefy_head_watch` is a stream that yields whenever
	/// `client-ethereum`'s light-client-head watcher observes a new
	/// `LatestBeefyBlock`; it is a concrete input here rather than owned by
	/// this crate, since reading the light client's event stream is the
	/// Ethereum connection's responsibility.
	pub async fn run(
		&self,
		beefy_head_watch: impl futures::Stream<Item = ()> + Unpin,
		cancel: CancellationToken,
	) -> Result<(), Error> {
		let poll = stream::repeat(()).then({
			let interval = self.poll_interval;
			move |_| async_std::task::sleep(interval)
		});
		let mut triggers = stream::select(poll, beefy_head_watch);

		loop {
			futures::select_biased! {
				_ = cancel.cancelled().fuse() => return Ok(()),
				trigger = triggers.next().fuse() => {
					match trigger {
						Some(()) => {
							if let Err(err) = self.run_once().await {
								log::warn!(target: "relay", "beefy catch-up cycle aborted: {err}, retrying next trigger");
							}
						}
						None => return Ok(()),
					}
				}
			}
		}
	}

	async fn run_once(&self) -> Result<(), Error> {
		let verified_relay_block_number = self.eth.latest_beefy_block().await?;
		let relay_block_hash = self.relay_chain.block_hash(verified_relay_block_number).await?;
		let heads_at_verified = self.relay_chain.all_paraheads_with_own(relay_block_hash).await?;
		let our_head = heads_at_verified.our_head().ok_or(Error::ProofRootMismatch)?;
		let verified_para_head_hash = self.parachain.block_hash(our_head.number).await?;
		let verified_para_block_number = our_head.number;

		let eth_nonces = ChannelNonces {
			basic: self.eth.channel_nonce(ChannelId::Basic).await?,
			incentivized: self.eth.channel_nonce(ChannelId::Incentivized).await?,
		};
		let para_nonces = read_para_nonces(self.parachain.as_ref(), verified_para_head_hash).await?;

		if eth_nonces.basic >= para_nonces.basic && eth_nonces.incentivized >= para_nonces.incentivized {
			return Ok(());
		}

		let blocks = search_for_lost_commitments(
			self.parachain.as_ref(),
			eth_nonces,
			para_nonces,
			verified_para_block_number,
		)
		.await?;

		for block in blocks {
			if block.digest_items_with_data.is_empty() {
				continue;
			}
			let with_proofs = self.augment_with_proofs(block, verified_relay_block_number).await?;
			self.emit(with_proofs).await?;
		}

		Ok(())
	}

	/// Walks `relay_chain_block_number` downward from
	/// `verified_relay_block_number` until the relay block's own parachain
	/// head matches `block.block_number`, then fetches the MMR leaf one
	/// block further down — the stop condition decrements the counter once
	/// extra by construction, matching the 0-indexed leaf / 1-indexed
	/// block-number offset — and builds the parachain-head proof.
	async fn augment_with_proofs(
		&self,
		block: ParaBlockWithDigest,
		verified_relay_block_number: u64,
	) -> Result<ParaBlockWithProofs, Error> {
		let mut relay_block_number = verified_relay_block_number;
		let heads_at_finalizing_block: ParaHeadsAtRelayBlock = loop {
			let relay_block_hash = self.relay_chain.block_hash(relay_block_number).await?;
			let heads = self.relay_chain.all_paraheads_with_own(relay_block_hash).await?;
			let our_number = heads.our_head().ok_or(Error::ProofRootMismatch)?.number;
			if our_number == block.block_number {
				break heads;
			}
			if relay_block_number == 0 {
				return Err(Error::ProofRootMismatch);
			}
			relay_block_number -= 1;
		};
		relay_block_number -= 1;

		let relay_block_hash = self.relay_chain.block_hash(relay_block_number).await?;
		let mmr_proof =
			self.relay_chain.mmr_leaf_for_block(relay_block_number, relay_block_hash).await?;
		let parachain_heads_root = leaf_parachain_heads_root(&mmr_proof.leaf)?;

		let para_head_proof = build_para_head_proof(&heads_at_finalizing_block, parachain_heads_root)?;
		let para_header = self.parachain.encoded_header(block.block_number).await?;

		Ok(ParaBlockWithProofs { block, mmr_proof, para_header, para_head_proof })
	}

	async fn emit(&self, with_proofs: ParaBlockWithProofs) -> Result<(), Error> {
		for item in with_proofs.block.digest_items_with_data {
			let (channel_id, commitment_hash) = item.digest_item.as_commitment();
			let package = MessagePackage {
				channel_id,
				commitment_hash,
				commitment_data: item.data,
				para_head: with_proofs.para_header.clone(),
				para_head_proof: with_proofs.para_head_proof.clone(),
				mmr_proof: with_proofs.mmr_proof.clone(),
			};
			self.packages.send(package).await.map_err(|_| Error::ChannelClosed)?;
		}
		Ok(())
	}
}

/// The leaf's SCALE-encoded `parachain_heads` field is itself a hash; this
/// crate treats the `EncodableOpaqueLeaf` bytes as opaque apart from that
/// one field, consistent with the connection seam's "pallet metadata is an
/// opaque schema" stance.
fn leaf_parachain_heads_root(encoded_leaf: &[u8]) -> Result<H256, Error> {
	if encoded_leaf.len() < 32 {
		return Err(Error::Decode("MMR leaf too short to contain a parachain_heads root".into()));
	}
	let mut root = [0u8; 32];
	root.copy_from_slice(&encoded_leaf[encoded_leaf.len() - 32..]);
	Ok(H256::from(root))
}
