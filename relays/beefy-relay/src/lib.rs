//! BEEFY listener, backward-search catch-up, and MMR/parachain-head
//! prover (C7, C8).

mod catchup;
mod connection;
mod error;
mod listener;
mod proof;

pub use catchup::{read_para_nonces, search_for_lost_commitments, ChannelNonces};
pub use connection::{
	EthLightClientConnection, EthLightClientRpc, EthViewCall, ParaHead, ParaHeadsAtRelayBlock,
	ParachainConnection, ParachainRpc, RelayChainConnection, RelayChainRpc,
};
pub use error::Error;
pub use listener::BeefyListener;
pub use proof::build_para_head_proof;
