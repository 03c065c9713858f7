use crate::{ChannelId, H160, H256, U256};
use codec::{Decode, Encode};
use scale_info::TypeInfo;

/// Decoded form of a parachain header's `DigestItem::Other` entry. The
/// SCALE-encoded bytes of this type are what `AuxiliaryDigestItem`
/// identifies; only the `Commitment` variant is relayed,
/// but the enum is kept open in case the runtime grows other auxiliary
/// items, matching the original `substrate.AuxiliaryDigestItem` shape.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode, TypeInfo)]
pub enum AuxiliaryDigestItem {
	Commitment { channel_id: ChannelId, hash: H256 },
}

impl AuxiliaryDigestItem {
	pub fn as_commitment(&self) -> (ChannelId, H256) {
		match self {
			AuxiliaryDigestItem::Commitment { channel_id, hash } => (*channel_id, *hash),
		}
	}
}

/// Common shape of a single outbound message record decoded from an
/// off-chain-indexed commitment blob.
pub trait OutboundChannelMessage {
	fn nonce(&self) -> u64;
}

#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode, TypeInfo)]
pub struct BasicOutboundChannelMessage {
	pub nonce: u64,
	pub target: H160,
	pub payload: Vec<u8>,
}

impl OutboundChannelMessage for BasicOutboundChannelMessage {
	fn nonce(&self) -> u64 {
		self.nonce
	}
}

#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode, TypeInfo)]
pub struct IncentivizedOutboundChannelMessage {
	pub nonce: u64,
	pub target: H160,
	pub fee: U256,
	pub payload: Vec<u8>,
}

impl OutboundChannelMessage for IncentivizedOutboundChannelMessage {
	fn nonce(&self) -> u64 {
		self.nonce
	}
}
