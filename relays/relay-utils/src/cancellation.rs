//! A cooperative cancellation token built on a closable multi-producer
//! channel, in place of a `context.Context` tree. Any holder
//! of a [`Canceller`] can cancel the whole scope; any holder of a
//! [`CancellationToken`] can observe it, either by polling
//! [`CancellationToken::is_cancelled`] or by awaiting
//! [`CancellationToken::cancelled`].

use async_std::channel::{bounded, Receiver, Sender};

#[derive(Clone)]
pub struct Canceller {
	tx: Sender<()>,
}

impl Canceller {
	/// Cancels the scope. Idempotent, and visible to every clone of the
	/// matching [`CancellationToken`] immediately.
	pub fn cancel(&self) {
		self.tx.close();
	}
}

#[derive(Clone)]
pub struct CancellationToken {
	rx: Receiver<()>,
}

impl CancellationToken {
	pub fn is_cancelled(&self) -> bool {
		self.rx.is_closed()
	}

	/// Resolves once the scope is cancelled. Never resolves otherwise (no
	/// message is ever sent on this channel; cancellation is signalled by
	/// closing it).
	pub async fn cancelled(&self) {
		let _ = self.rx.recv().await;
	}
}

pub fn cancellation_pair() -> (Canceller, CancellationToken) {
	let (tx, rx) = bounded(1);
	(Canceller { tx }, CancellationToken { rx })
}

#[cfg(test)]
mod tests {
	use super::*;

	#[async_std::test]
	async fn cancel_is_observed_by_every_clone() {
		let (canceller, token) = cancellation_pair();
		let other_token = token.clone();
		assert!(!token.is_cancelled());

		canceller.cancel();

		assert!(token.is_cancelled());
		assert!(other_token.is_cancelled());
		other_token.cancelled().await;
	}

	#[async_std::test]
	async fn cancel_from_a_clone_is_visible_to_the_original_canceller() {
		let (canceller, token) = cancellation_pair();
		let other_canceller = canceller.clone();

		other_canceller.cancel();

		assert!(token.is_cancelled());
	}
}
