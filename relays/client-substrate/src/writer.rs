//! C6: parachain writer. Consumes `(header, messages)` payloads
//! sequentially, wraps each into a `Utility.batch_all` call containing one
//! `VerifierLightclient.import_header` plus one message-submit call per
//! message, signs it with the current local nonce and a mortal era
//! anchored at the latest finalized block, and hands it to the pool.

use std::sync::Arc;

use codec::{Compact, Encode};
use relay_types::{ChannelId, Header, Message};
use sp_core::{sr25519, Pair, H256};

use crate::connection::SubstrateRpc;
use crate::error::Error;
use crate::pool::ExtrinsicPool;

/// Pallet/call indices are runtime metadata, not something this crate
/// hardcodes; they're supplied by configuration (which treats
/// pallet metadata as an opaque, externally-supplied schema).
#[derive(Clone, Copy, Debug)]
pub struct CallIndices {
	pub verifier_lightclient_pallet: u8,
	pub import_header_call: u8,
	pub basic_channel_pallet: u8,
	pub incentivized_channel_pallet: u8,
	pub submit_call: u8,
	pub utility_pallet: u8,
	pub batch_all_call: u8,
}

pub struct ParachainWriter<R> {
	rpc: Arc<R>,
	pool: ExtrinsicPool<R>,
	signer: sr25519::Pair,
	indices: CallIndices,
	genesis_hash: H256,
	local_nonce: u64,
}

impl<R: SubstrateRpc + 'static> ParachainWriter<R> {
	/// Queries `System.Account` for the signer's nonce and
	/// `Chain.GetBlockHash(0)` for genesis hash, caching both.
	pub async fn connect(
		rpc: Arc<R>,
		signer: sr25519::Pair,
		indices: CallIndices,
	) -> Result<Self, Error> {
		let account = signer.public().0;
		let local_nonce = rpc.account_nonce(&account).await?;
		let genesis_hash = rpc.genesis_hash().await?;
		let pool = ExtrinsicPool::new(rpc.clone());
		Ok(ParachainWriter { rpc, pool, signer, indices, genesis_hash, local_nonce })
	}

	pub fn local_nonce(&self) -> u64 {
		self.local_nonce
	}

	/// Writes one `(header, messages)` payload. `header` is `None` for any
	/// chunk after the first one the chunker produced for the same block —
	/// the header only needs importing once per block, so later chunks
	/// submit a messages-only batch. Increments the local nonce only once
	/// the pool has accepted the submission.
	pub async fn write(
		&mut self,
		channel_id: ChannelId,
		header: Option<Header>,
		messages: Vec<Message>,
	) -> Result<(), Error> {
		let mut calls = Vec::with_capacity(messages.len() + 1);
		if let Some(header) = &header {
			calls.push(self.encode_import_header(header));
		}
		calls.extend(messages.iter().map(|m| self.encode_submit_message(channel_id, m)));
		let batch = self.encode_batch_all(&calls);

		let finalized_at = self.rpc.best_finalized_header_number().await?;
		let extrinsic = self.sign(&batch, finalized_at)?;

		self.pool.wait_for_submit_and_watch(self.local_nonce, extrinsic).await?;
		self.local_nonce += 1;
		Ok(())
	}

	/// Drains remaining payloads without submitting, to unblock an
	/// upstream producer after `write` has already failed once.
	pub fn drain(&self, remaining: Vec<(ChannelId, Option<Header>, Vec<Message>)>) {
		if !remaining.is_empty() {
			log::warn!(target: "relay", "parachain writer draining {} unsent payloads after error", remaining.len());
		}
	}

	fn encode_import_header(&self, header: &Header) -> Vec<u8> {
		let mut call = vec![self.indices.verifier_lightclient_pallet, self.indices.import_header_call];
		call.extend(header.header_data.encode());
		call.extend(header.proof_data.encode());
		call
	}

	fn encode_submit_message(&self, channel_id: ChannelId, message: &Message) -> Vec<u8> {
		let pallet = match channel_id {
			ChannelId::Basic => self.indices.basic_channel_pallet,
			ChannelId::Incentivized => self.indices.incentivized_channel_pallet,
		};
		let mut call = vec![pallet, self.indices.submit_call];
		call.extend(message.encode());
		call
	}

	/// SCALE-encodes `Utility.batch_all(calls)` where `calls` are already
	/// call-encoded bytes: a `Vec<OpaqueCall>` is just a compact length
	/// prefix followed by the concatenated opaque bytes, since each call's
	/// own `Encode` impl is the identity over its already-encoded form.
	fn encode_batch_all(&self, calls: &[Vec<u8>]) -> Vec<u8> {
		let mut out = vec![self.indices.utility_pallet, self.indices.batch_all_call];
		out.extend(Compact(calls.len() as u32).encode());
		for call in calls {
			out.extend(call.iter());
		}
		out
	}

	fn sign(&self, call: &[u8], mortal_anchor: u64) -> Result<Vec<u8>, Error> {
		let mut payload = call.to_vec();
		payload.extend(self.local_nonce.encode());
		payload.extend(mortal_anchor.encode());
		payload.extend(self.genesis_hash.encode());

		let signature = self.signer.sign(&payload);

		let mut extrinsic = call.to_vec();
		extrinsic.extend(self.signer.public().0);
		extrinsic.extend(signature.0);
		extrinsic.extend(self.local_nonce.encode());
		Ok(extrinsic)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::status::TransactionStatus;
	use async_trait::async_trait;
	use futures::channel::mpsc::{unbounded, UnboundedReceiver};
	use relay_types::MessagePayload;

	struct FakeRpc;

	#[async_trait]
	impl SubstrateRpc for FakeRpc {
		async fn submit_and_watch(
			&self,
			_extrinsic: Vec<u8>,
		) -> Result<UnboundedReceiver<TransactionStatus>, Error> {
			let (tx, rx) = unbounded();
			tx.unbounded_send(TransactionStatus::OtherTerminal).unwrap();
			Ok(rx)
		}

		async fn account_nonce(&self, _account: &[u8]) -> Result<u64, Error> {
			Ok(42)
		}

		async fn genesis_hash(&self) -> Result<H256, Error> {
			Ok(H256::repeat_byte(7))
		}

		async fn best_finalized_header_number(&self) -> Result<u64, Error> {
			Ok(100)
		}
	}

	fn indices() -> CallIndices {
		CallIndices {
			verifier_lightclient_pallet: 10,
			import_header_call: 0,
			basic_channel_pallet: 11,
			incentivized_channel_pallet: 12,
			submit_call: 0,
			utility_pallet: 20,
			batch_all_call: 2,
		}
	}

	#[async_std::test]
	async fn startup_caches_nonce_and_genesis_hash() {
		let rpc = Arc::new(FakeRpc);
		let (pair, _) = sr25519::Pair::generate();
		let writer = ParachainWriter::connect(rpc, pair, indices()).await.unwrap();
		assert_eq!(writer.local_nonce(), 42);
		assert_eq!(writer.genesis_hash, H256::repeat_byte(7));
	}

	#[async_std::test]
	async fn write_advances_local_nonce_only_after_pool_acceptance() {
		let rpc = Arc::new(FakeRpc);
		let (pair, _) = sr25519::Pair::generate();
		let mut writer = ParachainWriter::connect(rpc, pair, indices()).await.unwrap();
		let starting_nonce = writer.local_nonce();

		let header = Header::new(vec![1, 2, 3], vec![4, 5, 6]);
		let message = Message {
			app_id: [9u8; 20],
			payload: MessagePayload::Basic { block_number: 1, event_index: 0 },
		};

		writer.write(ChannelId::Basic, Some(header), vec![message]).await.unwrap();
		assert_eq!(writer.local_nonce(), starting_nonce + 1);
	}
}
