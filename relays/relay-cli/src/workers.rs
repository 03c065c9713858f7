//! Adapters wiring the two relay-logic crates into `relay_utils::Worker`s
//! the supervisor can restart independently.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use beefy_relay::{BeefyListener, EthLightClientRpc, ParachainRpc, RelayChainRpc};
use futures::FutureExt;
use relay_ethereum_client::{BlockBatch, EthereumRpc, Listener};
use relay_substrate_client::{CallIndices, ParachainWriter, SubstrateRpc};
use relay_types::{ChannelId, MessagePackage};
use relay_utils::{CancellationToken, RelayError, Worker};
use sp_core::sr25519;

/// Resolves which parachain inbound channel an Ethereum message belongs to
/// from the contract address (`app_id`) that emitted it — the chunker only
/// groups by raw `app_id`, but the writer's `Utility.batch_all` needs to
/// know which channel pallet each message's submit call targets.
pub struct AppRouting {
	channel_by_app_id: HashMap<[u8; 20], ChannelId>,
}

impl AppRouting {
	pub fn new(basic_inbound: [u8; 20], incentivized_inbound: [u8; 20]) -> Self {
		let mut channel_by_app_id = HashMap::new();
		channel_by_app_id.insert(basic_inbound, ChannelId::Basic);
		channel_by_app_id.insert(incentivized_inbound, ChannelId::Incentivized);
		AppRouting { channel_by_app_id }
	}

	fn channel_for(&self, app_id: [u8; 20]) -> Result<ChannelId, RelayError> {
		self.channel_by_app_id.get(&app_id).copied().ok_or_else(|| {
			RelayError::logical(
				"app routing",
				format!("no configured channel for app id 0x{}", hex::encode(app_id)),
			)
		})
	}
}

/// Eth -> Para pipeline: drains the listener's block batches and hands each
/// one to the parachain writer, one `write` call per channel subgroup
/// within a batch (a batch may interleave more than one channel's
/// messages; the header is attached only to the first subgroup written for
/// the whole batch, never duplicated).
pub struct EthToParaWorker<ER, SR> {
	eth: Arc<ER>,
	substrate: Arc<SR>,
	descendants_until_final: u64,
	chunk_size: usize,
	start_height: u64,
	signer: sr25519::Pair,
	indices: CallIndices,
	routing: Arc<AppRouting>,
}

impl<ER, SR> EthToParaWorker<ER, SR> {
	pub fn new(
		eth: Arc<ER>,
		substrate: Arc<SR>,
		descendants_until_final: u64,
		chunk_size: usize,
		start_height: u64,
		signer: sr25519::Pair,
		indices: CallIndices,
		routing: Arc<AppRouting>,
	) -> Self {
		EthToParaWorker {
			eth,
			substrate,
			descendants_until_final,
			chunk_size,
			start_height,
			signer,
			indices,
			routing,
		}
	}
}

#[async_trait]
impl<ER, SR> Worker for EthToParaWorker<ER, SR>
where
	ER: EthereumRpc + 'static,
	SR: SubstrateRpc + 'static,
{
	async fn run(&mut self, cancel: CancellationToken) -> Result<(), RelayError> {
		let (listener, handles) =
			Listener::new(self.eth.clone(), self.descendants_until_final, self.chunk_size);
		let mut writer =
			ParachainWriter::connect(self.substrate.clone(), self.signer.clone(), self.indices)
				.await
				.map_err(|err| RelayError::from_classified("parachain writer connect", &err))?;

		let listener_run = listener.run(self.start_height, cancel.clone());
		let drain = drain_into_writer(handles.batches, &mut writer, &self.routing, &cancel);

		futures::pin_mut!(listener_run);
		futures::pin_mut!(drain);

		match futures::future::select(listener_run, drain).await {
			futures::future::Either::Left((result, _)) => {
				result.map_err(|err| RelayError::from_classified("eth listener", &err))
			}
			futures::future::Either::Right((result, _)) => result,
		}
	}
}

async fn drain_into_writer<SR: SubstrateRpc + 'static>(
	batches: async_std::channel::Receiver<BlockBatch>,
	writer: &mut ParachainWriter<SR>,
	routing: &AppRouting,
	cancel: &CancellationToken,
) -> Result<(), RelayError> {
	loop {
		let batch = futures::select_biased! {
			_ = cancel.cancelled().fuse() => return Ok(()),
			batch = batches.recv().fuse() => match batch {
				Ok(batch) => batch,
				Err(_) => return Ok(()),
			},
		};

		let mut header = batch.header;
		// The chunker only guarantees per-app-id FIFO order, not a
		// cross-channel ordering; each channel's own nonce is independent,
		// so which of the (at most two) channel subgroups is written
		// first within a batch doesn't matter.
		let mut by_channel: std::collections::HashMap<ChannelId, Vec<relay_types::Message>> =
			std::collections::HashMap::new();
		for message in batch.messages {
			let channel_id = routing.channel_for(message.app_id)?;
			by_channel.entry(channel_id).or_default().push(message);
		}

		if by_channel.is_empty() {
			// Header-only batch (a block with no outbound messages still
			// needs its header imported).
			writer
				.write(ChannelId::Basic, header.take(), Vec::new())
				.await
				.map_err(|err| RelayError::from_classified("parachain writer", &err))?;
			continue;
		}

		for (channel_id, messages) in by_channel {
			writer
				.write(channel_id, header.take(), messages)
				.await
				.map_err(|err| RelayError::from_classified("parachain writer", &err))?;
		}
	}
}

/// Para -> Eth pipeline: runs the BEEFY catch-up engine and forwards every
/// emitted package to `sink` (the out-of-core Ethereum submitter's inbox;
/// this crate's own non-goals).
pub struct BeefyWorker<P, R, E> {
	parachain: Arc<P>,
	relay_chain: Arc<R>,
	eth: Arc<E>,
	poll_interval: Duration,
	sink: async_std::channel::Sender<MessagePackage>,
}

impl<P, R, E> BeefyWorker<P, R, E> {
	pub fn new(
		parachain: Arc<P>,
		relay_chain: Arc<R>,
		eth: Arc<E>,
		poll_interval: Duration,
		sink: async_std::channel::Sender<MessagePackage>,
	) -> Self {
		BeefyWorker { parachain, relay_chain, eth, poll_interval, sink }
	}
}

#[async_trait]
impl<P, R, E> Worker for BeefyWorker<P, R, E>
where
	P: ParachainRpc + 'static,
	R: RelayChainRpc + 'static,
	E: EthLightClientRpc + 'static,
{
	async fn run(&mut self, cancel: CancellationToken) -> Result<(), RelayError> {
		let (packages_tx, packages_rx) = async_std::channel::bounded(1);
		let listener = BeefyListener::new(
			self.parachain.clone(),
			self.relay_chain.clone(),
			self.eth.clone(),
			self.poll_interval,
			packages_tx,
		);

		// No dedicated BEEFY-head-watch stream is wired up independently of
		// the fixed poll interval (the
		// Ethereum light client's event subscription out of core scope);
		// the poll interval alone drives catch-up cycles.
		let beefy_head_watch = futures::stream::pending::<()>();
		let listener_run = listener.run(beefy_head_watch, cancel.clone());
		let forward = forward_packages(packages_rx, &self.sink, &cancel);

		futures::pin_mut!(listener_run);
		futures::pin_mut!(forward);

		match futures::future::select(listener_run, forward).await {
			futures::future::Either::Left((result, _)) => {
				result.map_err(|err| RelayError::from_classified("beefy listener", &err))
			}
			futures::future::Either::Right((result, _)) => result,
		}
	}
}

async fn forward_packages(
	packages: async_std::channel::Receiver<MessagePackage>,
	sink: &async_std::channel::Sender<MessagePackage>,
	cancel: &CancellationToken,
) -> Result<(), RelayError> {
	loop {
		futures::select_biased! {
			_ = cancel.cancelled().fuse() => return Ok(()),
			package = packages.recv().fuse() => match package {
				Ok(package) => {
					if sink.send(package).await.is_err() {
						return Ok(());
					}
				}
				Err(_) => return Ok(()),
			},
		}
	}
}
