//! Connection seams needed by the catch-up engine. Both sides are
//! external collaborators per the out-of-core non-goals (wire framing,
//! keystore), so — as in `relay-ethereum-client`/`relay-substrate-client`
//! — these are thin `async_trait` seams the rest of the crate programs
//! against.

use async_trait::async_trait;
use codec::{Decode, Encode};
use jsonrpsee::core::client::ClientT;
use jsonrpsee::rpc_params;
use jsonrpsee::ws_client::{WsClient, WsClientBuilder};
use relay_types::{AuxiliaryDigestItem, ChannelId, MmrLeafProof, H256};

use crate::error::Error;

/// One sibling parachain's head at a relay block.
#[derive(Clone, Debug)]
pub struct ParaHead {
	pub para_id: u32,
	/// Decoded from the header by the connection, not by this crate — the
	/// header format itself is opaque runtime metadata.
	pub number: u64,
	pub head_data: Vec<u8>,
}

/// Every parachain head included in a relay block, as returned by
/// `GetAllParaheadsWithOwn`, plus which one is ours.
#[derive(Clone, Debug)]
pub struct ParaHeadsAtRelayBlock {
	pub all_heads: Vec<ParaHead>,
	pub our_para_id: u32,
}

impl ParaHeadsAtRelayBlock {
	pub fn our_head(&self) -> Option<&ParaHead> {
		self.all_heads.iter().find(|h| h.para_id == self.our_para_id)
	}
}

#[async_trait]
pub trait ParachainRpc: Send + Sync {
	/// Decoded `DigestItem::Other` entries for the parachain block, kept
	/// only if they decode to `AuxiliaryDigestItem::Commitment`.
	async fn commitments_at(&self, block_number: u64) -> Result<Vec<AuxiliaryDigestItem>, Error>;

	/// `Offchain.LocalStorageGet(Persistent, key)` for the commitment's
	/// off-chain-indexed blob.
	async fn offchain_commitment(&self, commitment_hash: H256) -> Result<Vec<u8>, Error>;

	/// `{Basic,Incentivized}OutboundModule.Nonce` at `at_block_hash`.
	async fn para_nonce(&self, channel_id: ChannelId, at_block_hash: H256) -> Result<u64, Error>;

	async fn block_hash(&self, block_number: u64) -> Result<H256, Error>;

	/// The SCALE-encoded header for `block_number`, to embed in the
	/// emitted `ParaBlockWithProofs::para_header`.
	async fn encoded_header(&self, block_number: u64) -> Result<Vec<u8>, Error>;
}

#[async_trait]
pub trait RelayChainRpc: Send + Sync {
	async fn block_hash(&self, relay_block_number: u64) -> Result<H256, Error>;

	async fn all_paraheads_with_own(
		&self,
		relay_block_hash: H256,
	) -> Result<ParaHeadsAtRelayBlock, Error>;

	async fn mmr_leaf_for_block(
		&self,
		relay_block_number: u64,
		relay_block_hash: H256,
	) -> Result<MmrLeafProof, Error>;
}

#[async_trait]
pub trait EthLightClientRpc: Send + Sync {
	/// The Ethereum light client's latest BEEFY-verified relay-chain block.
	async fn latest_beefy_block(&self) -> Result<u64, Error>;

	/// The inbound channel contract's currently-accepted nonce.
	async fn channel_nonce(&self, channel_id: ChannelId) -> Result<u64, Error>;
}

/// `twox_128(pallet) ++ twox_128(item)`, the fixed prefix of every plain
/// storage item's key — the same construction `subxt`/`polkadot-js` use,
/// kept here rather than pulled in as a dependency since only two storage
/// items are ever looked up.
fn plain_storage_key(pallet: &str, item: &str) -> Vec<u8> {
	let mut key = sp_core::hashing::twox_128(pallet.as_bytes()).to_vec();
	key.extend(sp_core::hashing::twox_128(item.as_bytes()));
	key
}

/// `Twox64Concat` map key: the fixed prefix plus `twox_64(encoded_key) ++
/// encoded_key`, matching `Paras::Heads`'s hasher.
fn twox64_concat_map_key(pallet: &str, item: &str, map_key: &[u8]) -> Vec<u8> {
	let mut key = plain_storage_key(pallet, item);
	key.extend(sp_core::hashing::twox_64(map_key));
	key.extend(map_key);
	key
}

/// `SCALE("commitment") ++ SCALE(hash)`, the off-chain-indexing key prefix
/// for outbound channel commitments.
fn offchain_commitment_key(commitment_hash: H256) -> Vec<u8> {
	let mut key = b"commitment".to_vec().encode();
	key.extend(commitment_hash.encode());
	key
}

/// Connection to the parachain this relayer is attached to: reads
/// per-channel outbound nonces, per-block auxiliary digest items, and the
/// off-chain-indexed commitment blobs they point at.
pub struct ParachainConnection {
	client: WsClient,
}

impl ParachainConnection {
	pub async fn connect(url: &str) -> Result<Self, Error> {
		let client = WsClientBuilder::default().build(url).await?;
		Ok(ParachainConnection { client })
	}

	async fn storage_at(&self, key: &[u8], at_block_hash: H256) -> Result<Option<Vec<u8>>, Error> {
		let raw: Option<String> = self
			.client
			.request("state_getStorage", rpc_params![format!("0x{}", hex::encode(key)), at_block_hash])
			.await?;
		raw.map(|s| hex::decode(s.trim_start_matches("0x")))
			.transpose()
			.map_err(|err| Error::Decode(format!("malformed storage value: {err}")))
	}
}

#[async_trait]
impl ParachainRpc for ParachainConnection {
	async fn commitments_at(&self, block_number: u64) -> Result<Vec<AuxiliaryDigestItem>, Error> {
		let block_hash: H256 = self
			.client
			.request("chain_getBlockHash", rpc_params![block_number])
			.await?;
		let header: serde_json::Value =
			self.client.request("chain_getHeader", rpc_params![block_hash]).await?;
		let logs = header
			.get("digest")
			.and_then(|d| d.get("logs"))
			.and_then(|l| l.as_array())
			.cloned()
			.unwrap_or_default();

		let mut items = Vec::new();
		for log in logs {
			let Some(hex_str) = log.as_str() else { continue };
			let Ok(bytes) = hex::decode(hex_str.trim_start_matches("0x")) else { continue };
			// Only `DigestItem::Other(bytes)` entries (SCALE prefix `0x00`)
			// can possibly be an `AuxiliaryDigestItem`; every other digest
			// item variant (seals, consensus, pre-runtime) is skipped.
			if bytes.first() != Some(&0u8) {
				continue;
			}
			if let Ok(item) = AuxiliaryDigestItem::decode(&mut &bytes[1..]) {
				items.push(item);
			}
		}
		Ok(items)
	}

	async fn offchain_commitment(&self, commitment_hash: H256) -> Result<Vec<u8>, Error> {
		let key = offchain_commitment_key(commitment_hash);
		let raw: Option<String> = self
			.client
			.request("offchain_localStorageGet", rpc_params!["PERSISTENT", format!("0x{}", hex::encode(&key))])
			.await?;
		let raw = raw.ok_or_else(|| Error::Decode("missing off-chain commitment blob".into()))?;
		hex::decode(raw.trim_start_matches("0x"))
			.map_err(|err| Error::Decode(format!("malformed commitment blob: {err}")))
	}

	async fn para_nonce(&self, channel_id: ChannelId, at_block_hash: H256) -> Result<u64, Error> {
		let (pallet, item) = channel_id.nonce_storage_item();
		let value = self.storage_at(&plain_storage_key(pallet, item), at_block_hash).await?;
		match value {
			None => Ok(0),
			Some(bytes) => u64::decode(&mut &bytes[..])
				.map_err(|err| Error::Decode(format!("malformed nonce: {err}"))),
		}
	}

	async fn block_hash(&self, block_number: u64) -> Result<H256, Error> {
		Ok(self.client.request("chain_getBlockHash", rpc_params![block_number]).await?)
	}

	async fn encoded_header(&self, block_number: u64) -> Result<Vec<u8>, Error> {
		let block_hash: H256 =
			self.client.request("chain_getBlockHash", rpc_params![block_number]).await?;
		let raw: String = self.client.request("chain_getHeaderRaw", rpc_params![block_hash]).await?;
		hex::decode(raw.trim_start_matches("0x"))
			.map_err(|err| Error::Decode(format!("malformed header bytes: {err}")))
	}
}

/// Connection to the relay chain securing the parachain: sibling parachain
/// heads and MMR leaves for a given relay block.
pub struct RelayChainConnection {
	client: WsClient,
	our_para_id: u32,
	/// Registered sibling parachain ids this relayer cares about. The
	/// `Paras` pallet's storage map is keyed by `ParaId`, which is itself
	/// runtime configuration (not discoverable from this crate's seams),
	/// so the set is supplied at construction the same way `CallIndices`
	/// supplies call shape (pallet metadata is treated as an
	/// opaque, externally-supplied schema).
	sibling_para_ids: Vec<u32>,
}

impl RelayChainConnection {
	pub async fn connect(
		url: &str,
		our_para_id: u32,
		sibling_para_ids: Vec<u32>,
	) -> Result<Self, Error> {
		let client = WsClientBuilder::default().build(url).await?;
		Ok(RelayChainConnection { client, our_para_id, sibling_para_ids })
	}
}

#[async_trait]
impl RelayChainRpc for RelayChainConnection {
	async fn block_hash(&self, relay_block_number: u64) -> Result<H256, Error> {
		Ok(self.client.request("chain_getBlockHash", rpc_params![relay_block_number]).await?)
	}

	async fn all_paraheads_with_own(
		&self,
		relay_block_hash: H256,
	) -> Result<ParaHeadsAtRelayBlock, Error> {
		let mut all_heads = Vec::with_capacity(self.sibling_para_ids.len());
		for para_id in &self.sibling_para_ids {
			let key = twox64_concat_map_key("Paras", "Heads", &para_id.encode());
			let raw: Option<String> = self
				.client
				.request(
					"state_getStorage",
					rpc_params![format!("0x{}", hex::encode(&key)), relay_block_hash],
				)
				.await?;
			let Some(raw) = raw else { continue };
			let head_data = hex::decode(raw.trim_start_matches("0x"))
				.map_err(|err| Error::Decode(format!("malformed parachain head: {err}")))?;
			let number = decode_head_number(&head_data)?;
			all_heads.push(ParaHead { para_id: *para_id, number, head_data });
		}
		Ok(ParaHeadsAtRelayBlock { all_heads, our_para_id: self.our_para_id })
	}

	async fn mmr_leaf_for_block(
		&self,
		relay_block_number: u64,
		relay_block_hash: H256,
	) -> Result<MmrLeafProof, Error> {
		let response: serde_json::Value = self
			.client
			.request("mmr_generateProof", rpc_params![relay_block_number, relay_block_hash])
			.await?;
		let leaf = response
			.get("leaf")
			.and_then(|v| v.as_str())
			.ok_or_else(|| Error::Decode("mmr_generateProof response missing leaf".into()))?;
		let proof = response
			.get("proof")
			.and_then(|v| v.as_str())
			.ok_or_else(|| Error::Decode("mmr_generateProof response missing proof".into()))?;
		let leaf = hex::decode(leaf.trim_start_matches("0x"))
			.map_err(|err| Error::Decode(format!("malformed mmr leaf: {err}")))?;
		let proof_bytes = hex::decode(proof.trim_start_matches("0x"))
			.map_err(|err| Error::Decode(format!("malformed mmr proof: {err}")))?;
		let items = Vec::<H256>::decode(&mut &proof_bytes[..])
			.map_err(|err| Error::Decode(format!("malformed mmr proof items: {err}")))?;
		Ok(MmrLeafProof { block_hash: relay_block_hash, leaf, items })
	}
}

/// Decodes just the block number field from a SCALE-encoded
/// `sp_runtime::generic::Header` prefix (parent_hash: H256, then a compact
/// block number) — the only field this crate needs from an otherwise
/// opaque runtime header.
fn decode_head_number(head_data: &[u8]) -> Result<u64, Error> {
	let mut input = head_data.get(32..).ok_or_else(|| {
		Error::Decode("parachain head shorter than a parent hash".into())
	})?;
	let number = codec::Compact::<u64>::decode(&mut input)
		.map_err(|err| Error::Decode(format!("malformed parachain head number: {err}")))?;
	Ok(number.0)
}

/// Contract address plus no-argument view-function selector, the two
/// pieces of ABI knowledge an `eth_call` needs; ABI encoding/decoding
/// itself is out of scope, so both are supplied
/// already resolved, the same way `CallIndices` supplies pallet/call
/// indices instead of decoding runtime metadata.
#[derive(Clone, Copy, Debug)]
pub struct EthViewCall {
	pub target: relay_types::H160,
	pub selector: [u8; 4],
}

/// Connection to the Ethereum-side light client contracts: how far the
/// light client's BEEFY verification has progressed, and each inbound
/// channel's currently-accepted nonce.
pub struct EthLightClientConnection {
	client: WsClient,
	basic_nonce: EthViewCall,
	incentivized_nonce: EthViewCall,
	latest_beefy_block: EthViewCall,
}

impl EthLightClientConnection {
	pub async fn connect(
		url: &str,
		basic_nonce: EthViewCall,
		incentivized_nonce: EthViewCall,
		latest_beefy_block: EthViewCall,
	) -> Result<Self, Error> {
		let client = WsClientBuilder::default().build(url).await?;
		Ok(EthLightClientConnection { client, basic_nonce, incentivized_nonce, latest_beefy_block })
	}

	async fn eth_call(&self, call: &EthViewCall) -> Result<u64, Error> {
		let result: String = self
			.client
			.request(
				"eth_call",
				rpc_params![
					serde_json::json!({
						"to": format!("0x{}", hex::encode(call.target.as_bytes())),
						"data": format!("0x{}", hex::encode(call.selector)),
					}),
					"latest"
				],
			)
			.await?;
		u64::from_str_radix(result.trim_start_matches("0x"), 16)
			.map_err(|err| Error::Decode(format!("malformed eth_call result: {err}")))
	}
}

#[async_trait]
impl EthLightClientRpc for EthLightClientConnection {
	async fn latest_beefy_block(&self) -> Result<u64, Error> {
		self.eth_call(&self.latest_beefy_block).await
	}

	async fn channel_nonce(&self, channel_id: ChannelId) -> Result<u64, Error> {
		let call = match channel_id {
			ChannelId::Basic => &self.basic_nonce,
			ChannelId::Incentivized => &self.incentivized_nonce,
		};
		self.eth_call(call).await
	}
}
