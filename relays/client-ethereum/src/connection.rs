//! C1 (Ethereum side): chain connection adapter. A thin seam over the
//! node's JSON-RPC surface — out of core scope per the wire-framing and
//! keystore non-goals, but the listener and proof builder need *some*
//! concrete way to fetch blocks, so this models it as an `async_trait`
//! the rest of the crate programs against, with a `jsonrpsee`-backed
//! implementation for production use.

use async_trait::async_trait;
use jsonrpsee::core::client::ClientT;
use jsonrpsee::rpc_params;
use jsonrpsee::ws_client::{WsClient, WsClientBuilder};
use relay_types::{H256, U256};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A decoded Ethereum log, already mapped onto the fields the listener and
/// proof builder need; the contract ABI itself is an opaque schema per the
/// connection's non-goals.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EthLog {
	pub app_id: [u8; 20],
	pub tx_index: u32,
	pub log_index: u32,
	pub block_hash: H256,
	pub block_number: u64,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct BlockHeader {
	pub number: U256,
	pub hash: H256,
	pub receipts_root: H256,
}

#[async_trait]
pub trait EthereumRpc: Send + Sync {
	/// Latest block number the node considers final, honouring the caller's
	/// `descendants_until_final` confirmation depth.
	async fn best_finalized_block_number(&self, descendants_until_final: u64) -> Result<u64, Error>;

	async fn header_by_number(&self, number: u64) -> Result<BlockHeader, Error>;

	/// Logs emitted in `block_hash`, in on-chain order.
	async fn logs_in_block(&self, block_hash: H256) -> Result<Vec<EthLog>, Error>;

	/// Every receipt in `block_hash`, RLP-encoded, in transaction-index
	/// order — the full set C2 rebuilds the receipt trie from.
	async fn receipts_in_block(&self, block_hash: H256) -> Result<Vec<Vec<u8>>, Error>;
}

pub struct EthereumConnection {
	client: WsClient,
}

impl EthereumConnection {
	pub async fn connect(url: &str) -> Result<Self, Error> {
		let client = WsClientBuilder::default().build(url).await?;
		Ok(EthereumConnection { client })
	}
}

#[async_trait]
impl EthereumRpc for EthereumConnection {
	async fn best_finalized_block_number(&self, descendants_until_final: u64) -> Result<u64, Error> {
		let tip: U256 = self
			.client
			.request("eth_blockNumber", rpc_params![])
			.await?;
		Ok(tip.as_u64().saturating_sub(descendants_until_final))
	}

	async fn header_by_number(&self, number: u64) -> Result<BlockHeader, Error> {
		let header: BlockHeader = self
			.client
			.request("eth_getBlockByNumber", rpc_params![format!("0x{number:x}"), false])
			.await?;
		Ok(header)
	}

	async fn logs_in_block(&self, block_hash: H256) -> Result<Vec<EthLog>, Error> {
		let raw: Vec<serde_json::Value> = self
			.client
			.request("eth_getLogs", rpc_params![serde_json::json!({ "blockHash": block_hash })])
			.await?;
		raw.into_iter().map(decode_log).collect()
	}

	async fn receipts_in_block(&self, block_hash: H256) -> Result<Vec<Vec<u8>>, Error> {
		let raw: Vec<String> = self
			.client
			.request("eth_getBlockReceipts", rpc_params![block_hash])
			.await?;
		raw.iter()
			.map(|hex_str| hex::decode(hex_str.trim_start_matches("0x")).map_err(|err| {
				Error::Decode(format!("malformed receipt hex: {err}"))
			}))
			.collect()
	}
}

fn decode_log(value: serde_json::Value) -> Result<EthLog, Error> {
	let address = value
		.get("address")
		.and_then(|v| v.as_str())
		.ok_or_else(|| Error::Decode("log missing address".into()))?;
	let mut app_id = [0u8; 20];
	hex::decode_to_slice(address.trim_start_matches("0x"), &mut app_id)
		.map_err(|err| Error::Decode(format!("malformed log address: {err}")))?;

	let tx_index = value
		.get("transactionIndex")
		.and_then(|v| v.as_str())
		.and_then(|s| u32::from_str_radix(s.trim_start_matches("0x"), 16).ok())
		.ok_or_else(|| Error::Decode("log missing transactionIndex".into()))?;
	let log_index = value
		.get("logIndex")
		.and_then(|v| v.as_str())
		.and_then(|s| u32::from_str_radix(s.trim_start_matches("0x"), 16).ok())
		.ok_or_else(|| Error::Decode("log missing logIndex".into()))?;
	let block_hash = value
		.get("blockHash")
		.and_then(|v| v.as_str())
		.ok_or_else(|| Error::Decode("log missing blockHash".into()))?;
	let block_hash: H256 = block_hash
		.parse()
		.map_err(|_| Error::Decode("malformed blockHash".into()))?;
	let block_number = value
		.get("blockNumber")
		.and_then(|v| v.as_str())
		.and_then(|s| u64::from_str_radix(s.trim_start_matches("0x"), 16).ok())
		.ok_or_else(|| Error::Decode("log missing blockNumber".into()))?;

	Ok(EthLog { app_id, tx_index, log_index, block_hash, block_number })
}
