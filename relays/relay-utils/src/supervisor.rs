//! C9: structured-concurrency worker pool. An explicit
//! [`CancellationToken`] stands in for a `context.Context` tree, and a
//! bounded, backed-off restart policy replaces an unconditional "restart
//! forever until cancelled" loop.

use crate::cancellation::{cancellation_pair, CancellationToken};
use crate::error::{ErrorClass, RelayError};
use async_trait::async_trait;
use backoff::{backoff::Backoff, ExponentialBackoff};
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook_async_std::Signals;
use std::time::Duration;

/// A long-running pipeline managed by the supervisor. `run` should return
/// `Ok(())` if it stops cleanly (the supervisor will restart it, subject to
/// the restart budget) and `Err` if it hits an error it cannot recover from
/// itself.
#[async_trait]
pub trait Worker: Send {
	async fn run(&mut self, cancel: CancellationToken) -> Result<(), RelayError>;
}

/// Constructs a fresh [`Worker`] instance. Invoked once per restart attempt;
/// a construction failure is unrecoverable and aborts the entire
/// supervisor scope.
pub type WorkerFactory = Box<dyn Fn() -> Result<Box<dyn Worker>, RelayError> + Send + Sync>;

const DEFAULT_MAX_RESTARTS: u32 = 5;
const MAX_RESTART_DELAY: Duration = Duration::from_secs(60);

pub struct Supervisor {
	workers: Vec<(String, WorkerFactory)>,
	max_restarts: u32,
}

impl Default for Supervisor {
	fn default() -> Self {
		Self::new(DEFAULT_MAX_RESTARTS)
	}
}

impl Supervisor {
	pub fn new(max_restarts: u32) -> Self {
		Supervisor { workers: Vec::new(), max_restarts }
	}

	pub fn register(&mut self, name: impl Into<String>, factory: WorkerFactory) {
		self.workers.push((name.into(), factory));
	}

	/// Runs every registered worker until either every worker exits
	/// cleanly and cancellation was requested, one worker returns an
	/// unrecoverable error, or a SIGINT/SIGTERM is received. Returns the
	/// first non-recoverable error, or `Ok(())` on clean shutdown.
	///
	/// Invariant: by the time this returns, every spawned task (workers and
	/// the signal watcher) has terminated.
	pub async fn run(self) -> Result<(), RelayError> {
		let (canceller, token) = cancellation_pair();
		let mut tasks = FuturesUnordered::new();

		{
			let canceller = canceller.clone();
			let token = token.clone();
			let signals = Signals::new([SIGINT, SIGTERM]).map_err(RelayError::Signal)?;
			let handle = signals.handle();
			tasks.push(async_std::task::spawn(async move {
				let mut signals = signals;
				futures::select_biased! {
					_ = token.cancelled().fuse() => {},
					signal = signals.next().fuse() => {
						if signal.is_some() {
							log::info!(target: "relay", "received shutdown signal, stopping all workers");
							canceller.cancel();
						}
					},
				}
				handle.close();
				Ok(())
			}));
		}

		for (name, factory) in self.workers {
			let token = token.clone();
			let canceller = canceller.clone();
			let max_restarts = self.max_restarts;
			tasks.push(async_std::task::spawn(async move {
				let result = run_worker_with_restarts(&name, &factory, token, max_restarts).await;
				if result.is_err() {
					// An unrecoverable error in one worker cancels every sibling.
					canceller.cancel();
				}
				result
			}));
		}

		let mut first_error = None;
		while let Some(result) = tasks.next().await {
			if let Err(err) = result {
				log::error!(target: "relay", "supervisor scope failing: {err}");
				if first_error.is_none() {
					first_error = Some(err);
				}
				canceller.cancel();
			}
		}

		match first_error {
			Some(err) => Err(err),
			None => Ok(()),
		}
	}
}

async fn run_worker_with_restarts(
	name: &str,
	factory: &WorkerFactory,
	token: CancellationToken,
	max_restarts: u32,
) -> Result<(), RelayError> {
	let mut restarts = 0u32;
	let mut backoff = ExponentialBackoff { max_elapsed_time: None, ..ExponentialBackoff::default() };

	loop {
		if token.is_cancelled() {
			return Ok(());
		}

		let mut worker = factory()?;
		log::info!(target: "relay", "starting worker '{name}'");
		let outcome = worker.run(token.clone()).await;

		if token.is_cancelled() {
			return Ok(());
		}

		let restartable = match &outcome {
			Ok(()) => true,
			Err(err) => err.class() == ErrorClass::Transient,
		};

		if !restartable {
			return outcome;
		}

		if restarts >= max_restarts {
			return Err(outcome.err().unwrap_or(RelayError::RestartBudgetExhausted {
				worker: name.to_string(),
				attempts: restarts,
			}));
		}

		restarts += 1;
		let delay = backoff.next_backoff().unwrap_or(MAX_RESTART_DELAY);
		log::warn!(
			target: "relay",
			"worker '{name}' stopped ({outcome:?}), restarting (attempt {restarts}/{max_restarts}) after {delay:?}"
		);
		async_std::task::sleep(delay).await;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicU32, Ordering};
	use std::sync::Arc;

	struct FlakyWorker {
		attempts: Arc<AtomicU32>,
		fail_until: u32,
	}

	#[async_trait]
	impl Worker for FlakyWorker {
		async fn run(&mut self, _cancel: CancellationToken) -> Result<(), RelayError> {
			let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
			if attempt <= self.fail_until {
				Err(RelayError::transient("flaky-worker", "simulated transient failure"))
			} else {
				Ok(())
			}
		}
	}

	#[async_std::test]
	async fn transient_failures_are_retried_up_to_the_budget() {
		let attempts = Arc::new(AtomicU32::new(0));
		let counted = attempts.clone();
		let token_src = cancellation_pair();
		let token = token_src.1.clone();

		let factory: WorkerFactory = Box::new(move || {
			Ok(Box::new(FlakyWorker { attempts: counted.clone(), fail_until: 2 }) as Box<dyn Worker>)
		});

		// Run directly (not through Supervisor::run) so the test doesn't
		// need a real signal handler; exercises the same restart loop.
		let result = run_worker_with_restarts("flaky", &factory, token, 5).await;
		assert!(result.is_ok());
		assert_eq!(attempts.load(Ordering::SeqCst), 3);
	}

	#[async_std::test]
	async fn exhausting_the_restart_budget_is_fatal() {
		let attempts = Arc::new(AtomicU32::new(0));
		let counted = attempts.clone();
		let token_src = cancellation_pair();
		let token = token_src.1.clone();

		let factory: WorkerFactory = Box::new(move || {
			Ok(Box::new(FlakyWorker { attempts: counted.clone(), fail_until: u32::MAX }) as Box<dyn Worker>)
		});

		let result = run_worker_with_restarts("always-flaky", &factory, token, 2).await;
		assert!(result.is_err());
		assert_eq!(attempts.load(Ordering::SeqCst), 3); // initial attempt + 2 restarts
	}

	#[async_std::test]
	async fn logical_errors_are_not_retried() {
		struct AlwaysLogical;
		#[async_trait]
		impl Worker for AlwaysLogical {
			async fn run(&mut self, _cancel: CancellationToken) -> Result<(), RelayError> {
				Err(RelayError::logical("ctx", "bad nonce"))
			}
		}

		let token_src = cancellation_pair();
		let token = token_src.1.clone();
		let factory: WorkerFactory = Box::new(|| Ok(Box::new(AlwaysLogical) as Box<dyn Worker>));

		let result = run_worker_with_restarts("logical", &factory, token, 5).await;
		assert!(matches!(result, Err(RelayError::Logical { .. })));
	}
}
