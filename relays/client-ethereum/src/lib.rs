//! Ethereum-side connection, receipt-trie proof builder, block listener
//! and message chunker (C1-eth, C2, C3, C4).

mod chunker;
mod connection;
mod error;
mod listener;
mod proof;

pub use chunker::Chunker;
pub use connection::{BlockHeader, EthLog, EthereumConnection, EthereumRpc};
pub use error::Error;
pub use listener::{BlockBatch, Listener, ListenerHandles};
pub use proof::ReceiptTrie;
