//! Wire data model shared between the Ethereum and parachain sides of the
//! relayer. Kept dependency-light (codec + scale-info + sp-core only) so
//! that every other crate in the workspace can speak the same types without
//! pulling in RPC clients or proof-construction machinery.

mod channel;
mod digest;
mod header;
mod message;
mod package;
mod proof;

pub use channel::ChannelId;
pub use digest::{
	AuxiliaryDigestItem, BasicOutboundChannelMessage, IncentivizedOutboundChannelMessage,
	OutboundChannelMessage,
};
pub use header::Header;
pub use message::{Message, MessagePayload, MptProofSet, ReceiptProof};
pub use package::{DigestItemWithData, MessagePackage, ParaBlockWithDigest, ParaBlockWithProofs};
pub use proof::{MmrLeafProof, ParaHeadProof};

pub use sp_core::{H160, H256, U256};

#[cfg(test)]
mod tests {
	use super::*;
	use codec::{Decode, Encode};

	#[test]
	fn message_round_trips_through_scale() {
		let input = Message {
			app_id: [7u8; 20],
			payload: MessagePayload::Basic { block_number: 938, event_index: 4 },
		};
		let encoded = input.encode();
		let decoded = Message::decode(&mut &encoded[..]).expect("decodes");
		assert_eq!(input, decoded);
	}

	#[test]
	fn receipt_proof_message_round_trips() {
		let input = Message {
			app_id: [1u8; 20],
			payload: MessagePayload::ReceiptProof(ReceiptProof {
				block_hash: H256::repeat_byte(9),
				tx_index: 3,
				proof: MptProofSet {
					keys: vec![vec![1, 2, 3]],
					values: vec![vec![4, 5, 6]],
				},
			}),
		};
		let encoded = input.encode();
		let decoded = Message::decode(&mut &encoded[..]).expect("decodes");
		assert_eq!(input, decoded);
	}
}
