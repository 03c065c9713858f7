//! Parachain/relay-chain connection, extrinsic submission pool and
//! parachain writer (C1-para/relay, C5, C6).

mod connection;
mod error;
mod pool;
mod status;
mod writer;

pub use connection::{SubstrateConnection, SubstrateRpc};
pub use error::Error;
pub use pool::{ExtrinsicPool, MAX_WATCHED};
pub use status::TransactionStatus;
pub use writer::{CallIndices, ParachainWriter};
