//! C4: message chunker. Partitions a per-`app_id` message grouping into
//! chunks of at most `k` messages, round-robining across app_ids with a
//! non-empty remainder so no single app starves the others. Per-app_id
//! order is FIFO throughout.

use std::collections::{BTreeMap, VecDeque};

use relay_types::Message;

pub struct Chunker {
	queues: BTreeMap<[u8; 20], VecDeque<Message>>,
	order: Vec<[u8; 20]>,
	cursor: usize,
	chunk_size: usize,
}

impl Chunker {
	/// `groups` maps an app_id to its messages in emission order.
	/// `chunk_size` must be non-zero.
	pub fn new(groups: BTreeMap<[u8; 20], Vec<Message>>, chunk_size: usize) -> Self {
		assert!(chunk_size > 0, "chunk_size must be non-zero");
		let order: Vec<[u8; 20]> = groups.keys().copied().collect();
		let queues = groups.into_iter().map(|(app_id, msgs)| (app_id, msgs.into())).collect();
		Chunker { queues, order, cursor: 0, chunk_size }
	}

	/// Pulls the next chunk. Returns `(chunk, has_more)`; `has_more` is
	/// `false` on the last non-empty call, or on an empty call once every
	/// queue has drained.
	pub fn next(&mut self) -> (Vec<Message>, bool) {
		let mut chunk = Vec::with_capacity(self.chunk_size);
		if self.order.is_empty() {
			return (chunk, false);
		}

		let start = self.cursor;
		loop {
			let app_id = self.order[self.cursor];
			if let Some(queue) = self.queues.get_mut(&app_id) {
				if let Some(message) = queue.pop_front() {
					chunk.push(message);
				}
			}
			self.cursor = (self.cursor + 1) % self.order.len();
			if chunk.len() == self.chunk_size || self.cursor == start {
				break;
			}
		}

		let has_more = self.queues.values().any(|q| !q.is_empty());
		(chunk, has_more)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use relay_types::MessagePayload;

	fn msg(app_id: [u8; 20], n: u64) -> Message {
		Message { app_id, payload: MessagePayload::Basic { block_number: n, event_index: 0 } }
	}

	fn app(tag: u8) -> [u8; 20] {
		let mut id = [0u8; 20];
		id[19] = tag;
		id
	}

	#[test]
	fn round_robins_across_app_ids_preserving_per_app_order() {
		let a = app(b'a');
		let b = app(b'b');
		let c = app(b'c');
		let d = app(b'd');

		let mut groups = BTreeMap::new();
		groups.insert(a, vec![msg(a, 1), msg(a, 2), msg(a, 3)]);
		groups.insert(b, vec![msg(b, 1)]);
		groups.insert(c, vec![msg(c, 1), msg(c, 2)]);
		groups.insert(d, vec![msg(d, 1)]);

		let mut chunker = Chunker::new(groups, 2);

		let (chunk1, more1) = chunker.next();
		assert_eq!(chunk1, vec![msg(a, 1), msg(b, 1)]);
		assert!(more1);

		let (chunk2, more2) = chunker.next();
		assert_eq!(chunk2, vec![msg(c, 1), msg(d, 1)]);
		assert!(more2);

		let (chunk3, more3) = chunker.next();
		assert_eq!(chunk3, vec![msg(a, 2), msg(c, 2)]);
		assert!(more3);

		let (chunk4, more4) = chunker.next();
		assert_eq!(chunk4, vec![msg(a, 3)]);
		assert!(!more4);
	}

	#[test]
	fn empty_input_yields_empty_chunk_with_no_more() {
		let mut chunker = Chunker::new(BTreeMap::new(), 4);
		let (chunk, more) = chunker.next();
		assert!(chunk.is_empty());
		assert!(!more);
	}
}
