//! C5: extrinsic submission pool. `wait_for_submit_and_watch` blocks until
//! the pool has spare watcher capacity, then spawns a detached watcher and
//! returns — the caller never awaits the extrinsic's finalization.
//!
//! The `watched` counter and `max_nonce_observed_terminal` are the pool's
//! only shared state, guarded by a single [`parking_lot::Mutex`] that is
//! never held across an `.await` or sleep point (re-derived from the §4.4
//! invariants rather than mirrored, per the open-question decision
//! recorded for this component).

use std::sync::Arc;
use std::time::Duration;

use futures::stream::StreamExt;
use parking_lot::Mutex;

use crate::connection::SubstrateRpc;
use crate::error::Error;
use crate::status::TransactionStatus;

pub const MAX_WATCHED: usize = 500;
const CAPACITY_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Default)]
struct PoolState {
	watched: usize,
	max_nonce_observed_terminal: u64,
}

pub struct ExtrinsicPool<R> {
	rpc: Arc<R>,
	state: Arc<Mutex<PoolState>>,
}

impl<R: SubstrateRpc + 'static> ExtrinsicPool<R> {
	pub fn new(rpc: Arc<R>) -> Self {
		ExtrinsicPool { rpc, state: Arc::new(Mutex::new(PoolState::default())) }
	}

	pub fn watched(&self) -> usize {
		self.state.lock().watched
	}

	/// Blocks until the pool has spare capacity, then launches an async
	/// watcher and returns without waiting for a terminal status.
	pub async fn wait_for_submit_and_watch(
		&self,
		nonce: u64,
		extrinsic: Vec<u8>,
	) -> Result<(), Error> {
		loop {
			{
				let mut state = self.state.lock();
				if state.watched < MAX_WATCHED {
					state.watched += 1;
					break;
				}
			}
			async_std::task::sleep(CAPACITY_POLL_INTERVAL).await;
		}

		let rpc = self.rpc.clone();
		let state = self.state.clone();
		async_std::task::spawn(async move {
			if let Err(err) = watch(rpc, state.clone(), nonce, extrinsic).await {
				log::warn!(target: "relay", "extrinsic watcher for nonce {nonce} gave up: {err}");
				state.lock().watched -= 1;
			}
		});

		Ok(())
	}
}

async fn watch<R: SubstrateRpc>(
	rpc: Arc<R>,
	state: Arc<Mutex<PoolState>>,
	nonce: u64,
	extrinsic: Vec<u8>,
) -> Result<(), Error> {
	let current_extrinsic = extrinsic;
	loop {
		let mut statuses = rpc.submit_and_watch(current_extrinsic.clone()).await?;
		loop {
			let status = match statuses.next().await {
				Some(status) => status,
				None => {
					state.lock().watched -= 1;
					return Ok(());
				}
			};
			match status {
				TransactionStatus::Ready | TransactionStatus::Future | TransactionStatus::Broadcast => {
					continue;
				}
				TransactionStatus::Dropped | TransactionStatus::Invalid => {
					let max_observed = state.lock().max_nonce_observed_terminal;
					let delay_secs = nonce.saturating_sub(max_observed) * 5;
					async_std::task::sleep(Duration::from_secs(delay_secs)).await;

					if nonce <= state.lock().max_nonce_observed_terminal {
						let mut state = state.lock();
						state.watched -= 1;
						return Ok(());
					}
					// Resubmit the same signed extrinsic and keep watching.
					break;
				}
				TransactionStatus::OtherTerminal => {
					let mut state = state.lock();
					state.max_nonce_observed_terminal = state.max_nonce_observed_terminal.max(nonce);
					state.watched -= 1;
					return Ok(());
				}
			}
		}
		// Falls through on `Dropped`/`Invalid` below the max observed
		// nonce-gap threshold: resubmit the same signed bytes and loop.
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use futures::channel::mpsc::{unbounded, UnboundedReceiver};
	use relay_types::H256;
	use std::sync::atomic::{AtomicUsize, Ordering};

	struct FakeRpc {
		scripted: Mutex<Vec<Vec<TransactionStatus>>>,
		submissions: AtomicUsize,
	}

	#[async_trait]
	impl SubstrateRpc for FakeRpc {
		async fn submit_and_watch(
			&self,
			_extrinsic: Vec<u8>,
		) -> Result<UnboundedReceiver<TransactionStatus>, Error> {
			self.submissions.fetch_add(1, Ordering::SeqCst);
			let script = self.scripted.lock().remove(0);
			let (tx, rx) = unbounded();
			for status in script {
				tx.unbounded_send(status).unwrap();
			}
			Ok(rx)
		}

		async fn account_nonce(&self, _account: &[u8]) -> Result<u64, Error> {
			Ok(0)
		}

		async fn genesis_hash(&self) -> Result<H256, Error> {
			Ok(H256::zero())
		}

		async fn best_finalized_header_number(&self) -> Result<u64, Error> {
			Ok(0)
		}
	}

	#[async_std::test]
	async fn terminal_status_releases_a_watcher_slot() {
		let rpc = Arc::new(FakeRpc {
			scripted: Mutex::new(vec![vec![TransactionStatus::Ready, TransactionStatus::OtherTerminal]]),
			submissions: AtomicUsize::new(0),
		});
		let pool = ExtrinsicPool::new(rpc);

		pool.wait_for_submit_and_watch(1, vec![1, 2, 3]).await.unwrap();
		assert_eq!(pool.watched(), 1);

		for _ in 0..50 {
			if pool.watched() == 0 {
				break;
			}
			async_std::task::sleep(Duration::from_millis(10)).await;
		}
		assert_eq!(pool.watched(), 0);
	}

	#[async_std::test]
	async fn dropped_below_max_observed_nonce_succeeds_without_resubmit() {
		let rpc = Arc::new(FakeRpc {
			scripted: Mutex::new(vec![vec![TransactionStatus::Dropped]]),
			submissions: AtomicUsize::new(0),
		});
		let pool = ExtrinsicPool::new(rpc.clone());
		pool.state.lock().max_nonce_observed_terminal = 10;

		pool.wait_for_submit_and_watch(5, vec![1]).await.unwrap();

		for _ in 0..50 {
			if pool.watched() == 0 {
				break;
			}
			async_std::task::sleep(Duration::from_millis(10)).await;
		}
		assert_eq!(pool.watched(), 0);
		assert_eq!(rpc.submissions.load(Ordering::SeqCst), 1);
	}
}
