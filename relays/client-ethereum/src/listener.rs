//! C3: finality-aware Ethereum listener. Walks blocks from `start_height`
//! while keeping `descendants_until_final` confirmations behind the tip,
//! emitting `(header, messages)` per block strictly in block-number order.
//!
//! Header and messages travel on one channel as a single [`BlockBatch`]
//! rather than two separate streams: a consumer reading two independently
//! polled channels from one sequential producer has no reliable way to
//! tell "no more chunks follow for this block" from "the next header has
//! arrived" without racing them, since both conditions look identical from
//! outside. Bundling them removes the ambiguity — `header` is `Some` only
//! on a block's first batch (sent even when that block has no messages, so
//! every block's header still gets imported), `None` on every later chunk
//! of the same block.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_std::channel::{bounded, Receiver, Sender};
use relay_types::{Header, Message, MessagePayload, ReceiptProof};
use relay_utils::{CancellationToken, Classify};

use crate::chunker::Chunker;
use crate::connection::EthereumRpc;
use crate::error::Error;
use crate::proof::ReceiptTrie;

const BATCH_CHANNEL_CAPACITY: usize = 1;
const INITIAL_BACKOFF: Duration = Duration::from_millis(500);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

#[derive(Debug, PartialEq, Eq)]
enum State {
	Idle,
	Fetching(u64),
	Emitting(u64),
}

/// One chunk of a block's outbound messages, with the block's header
/// attached exactly once (on the first chunk).
#[derive(Debug, Clone)]
pub struct BlockBatch {
	pub header: Option<Header>,
	pub messages: Vec<Message>,
}

pub struct ListenerHandles {
	pub batches: Receiver<BlockBatch>,
}

pub struct Listener<R> {
	rpc: Arc<R>,
	descendants_until_final: u64,
	chunk_size: usize,
	batch_tx: Sender<BlockBatch>,
}

impl<R: EthereumRpc + 'static> Listener<R> {
	pub fn new(
		rpc: Arc<R>,
		descendants_until_final: u64,
		chunk_size: usize,
	) -> (Self, ListenerHandles) {
		let (batch_tx, batches) = bounded(BATCH_CHANNEL_CAPACITY);
		(Listener { rpc, descendants_until_final, chunk_size, batch_tx }, ListenerHandles { batches })
	}

	pub async fn run(&self, start_height: u64, cancel: CancellationToken) -> Result<(), Error> {
		let mut state = State::Idle;
		let mut next_height = start_height;
		let mut backoff = INITIAL_BACKOFF;

		loop {
			if cancel.is_cancelled() {
				self.batch_tx.close();
				return Ok(());
			}

			state = match state {
				State::Idle => {
					let finalized =
						match self.rpc.best_finalized_block_number(self.descendants_until_final).await {
							Ok(height) => height,
							Err(err) => {
								log::warn!(target: "relay", "eth listener: {err}, backing off {backoff:?}");
								async_std::task::sleep(backoff).await;
								backoff = (backoff * 2).min(MAX_BACKOFF);
								continue;
							}
						};
					if next_height > finalized {
						async_std::task::sleep(Duration::from_secs(1)).await;
						continue;
					}
					backoff = INITIAL_BACKOFF;
					State::Fetching(next_height)
				}
				State::Fetching(height) => match self.fetch_and_emit(height).await {
					Ok(()) => {
						next_height = height + 1;
						State::Emitting(height)
					}
					Err(err) if err.class() == relay_utils::ErrorClass::Transient => {
						log::warn!(target: "relay", "eth listener: {err}, backing off {backoff:?}");
						async_std::task::sleep(backoff).await;
						backoff = (backoff * 2).min(MAX_BACKOFF);
						State::Idle
					}
					Err(err) => return Err(err),
				},
				State::Emitting(_) => State::Idle,
			};
		}
	}

	async fn fetch_and_emit(&self, height: u64) -> Result<(), Error> {
		let block = self.rpc.header_by_number(height).await?;
		let header = Header::new(
			block.hash.as_bytes().to_vec(),
			block.receipts_root.as_bytes().to_vec(),
		);

		let logs = self.rpc.logs_in_block(block.hash).await?;
		let receipts = self.rpc.receipts_in_block(block.hash).await?;

		let mut groups: BTreeMap<[u8; 20], Vec<Message>> = BTreeMap::new();
		if !logs.is_empty() {
			let mut trie = ReceiptTrie::build(&receipts, block.receipts_root.as_bytes())?;
			for log in logs {
				let proof = trie.prove(log.tx_index)?;
				let message = Message {
					app_id: log.app_id,
					payload: MessagePayload::ReceiptProof(ReceiptProof {
						block_hash: log.block_hash,
						tx_index: log.tx_index,
						proof,
					}),
				};
				groups.entry(log.app_id).or_default().push(message);
			}
		}

		// The first batch is sent even when empty, so every block's header
		// is imported on-chain even if it carries no messages; later
		// batches for the same block are only sent when non-empty.
		let mut chunker = Chunker::new(groups, self.chunk_size);
		let mut header = Some(header);
		loop {
			let (messages, has_more) = chunker.next();
			if header.is_some() || !messages.is_empty() {
				let batch = BlockBatch { header: header.take(), messages };
				self.batch_tx.send(batch).await.map_err(|_| Error::ChannelClosed)?;
			}
			if !has_more {
				break;
			}
		}

		Ok(())
	}
}
