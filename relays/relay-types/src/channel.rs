use codec::{Decode, Encode};
use scale_info::TypeInfo;
use std::fmt;

/// Identifies one of the two independent, monotonically-nonced outbound
/// channels a parachain exposes to Ethereum.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Encode, Decode, TypeInfo)]
pub enum ChannelId {
	Basic,
	Incentivized,
}

impl fmt::Display for ChannelId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ChannelId::Basic => write!(f, "basic"),
			ChannelId::Incentivized => write!(f, "incentivized"),
		}
	}
}

impl ChannelId {
	/// Name of the pallet storage item tracking this channel's outbound nonce,
	/// matching `BasicOutboundModule.Nonce` / `IncentivizedOutboundModule.Nonce`
	/// from the original relayer.
	pub fn nonce_storage_item(&self) -> (&'static str, &'static str) {
		match self {
			ChannelId::Basic => ("BasicOutboundModule", "Nonce"),
			ChannelId::Incentivized => ("IncentivizedOutboundModule", "Nonce"),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn display_is_lowercase() {
		assert_eq!(ChannelId::Basic.to_string(), "basic");
		assert_eq!(ChannelId::Incentivized.to_string(), "incentivized");
	}
}
