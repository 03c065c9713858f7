//! YAML configuration, with `ARTEMIS_*` environment variables overriding
//! individual fields — matching the original relayer's config surface.

use std::path::Path;
use std::time::Duration;

use beefy_relay::EthViewCall;
use relay_types::H160;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
	pub ethereum: EthereumConfig,
	pub parachain: ParachainConfig,
	pub relaychain: RelaychainConfig,
	pub beefy: BeefyConfig,
	#[serde(default)]
	pub supervisor: SupervisorConfig,
	pub pallets: PalletIndicesConfig,
}

/// Pallet/call indices, supplied by config since this crate treats pallet
/// metadata as an opaque, externally-supplied schema.
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct PalletIndicesConfig {
	pub verifier_lightclient_pallet: u8,
	pub import_header_call: u8,
	pub basic_channel_pallet: u8,
	pub incentivized_channel_pallet: u8,
	pub submit_call: u8,
	pub utility_pallet: u8,
	pub batch_all_call: u8,
}

impl From<PalletIndicesConfig> for relay_substrate_client::CallIndices {
	fn from(config: PalletIndicesConfig) -> Self {
		relay_substrate_client::CallIndices {
			verifier_lightclient_pallet: config.verifier_lightclient_pallet,
			import_header_call: config.import_header_call,
			basic_channel_pallet: config.basic_channel_pallet,
			incentivized_channel_pallet: config.incentivized_channel_pallet,
			submit_call: config.submit_call,
			utility_pallet: config.utility_pallet,
			batch_all_call: config.batch_all_call,
		}
	}
}

#[derive(Debug, Deserialize, Clone)]
pub struct EthereumConfig {
	pub endpoint: String,
	pub descendants_until_final: u64,
	#[serde(default = "default_start_height")]
	pub start_height: u64,
	#[serde(default = "default_chunk_size")]
	pub chunk_size: usize,
	/// Signing key for the out-of-core Ethereum submitter; parsed here so
	/// config loading is centralized, but unused by this crate's own
	/// (read-only) Ethereum-side components.
	pub private_key: Option<String>,
	pub channels: ChannelsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChannelsConfig {
	pub basic: ChannelConfig,
	pub incentivized: ChannelConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChannelConfig {
	/// Hex-encoded, `0x`-prefixed 20-byte contract address.
	pub inbound: String,
}

impl ChannelConfig {
	pub fn inbound_address(&self) -> anyhow::Result<H160> {
		parse_h160(&self.inbound)
	}
}

#[derive(Debug, Deserialize, Clone)]
pub struct ParachainConfig {
	pub endpoint: String,
	/// BIP-39 mnemonic or SURI for the sr25519 signer submitting extrinsics.
	pub private_key: Option<String>,
	pub para_id: u32,
	#[serde(default)]
	pub sibling_para_ids: Vec<u32>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RelaychainConfig {
	pub endpoint: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BeefyConfig {
	#[serde(default = "default_beefy_poll_interval_secs")]
	pub poll_interval_secs: u64,
	pub light_client: EthLightClientConfig,
}

impl BeefyConfig {
	pub fn poll_interval(&self) -> Duration {
		Duration::from_secs(self.poll_interval_secs)
	}
}

/// ABI knowledge the BEEFY catch-up engine needs from the Ethereum light
/// client contract: its own address plus the selector for its
/// `latestBeefyBlock()`-style view function.
#[derive(Debug, Deserialize, Clone)]
pub struct EthLightClientConfig {
	pub address: String,
	/// Hex-encoded 4-byte function selector.
	pub latest_beefy_block_selector: String,
	/// Hex-encoded 4-byte function selector, shared by both inbound
	/// channel contracts' `nonce()`-style view function.
	pub nonce_selector: String,
}

impl EthLightClientConfig {
	pub fn latest_beefy_block_call(&self) -> anyhow::Result<EthViewCall> {
		Ok(EthViewCall {
			target: parse_h160(&self.address)?,
			selector: parse_selector(&self.latest_beefy_block_selector)?,
		})
	}

	pub fn nonce_call(&self, channel: &ChannelConfig) -> anyhow::Result<EthViewCall> {
		Ok(EthViewCall {
			target: channel.inbound_address()?,
			selector: parse_selector(&self.nonce_selector)?,
		})
	}
}

fn parse_h160(value: &str) -> anyhow::Result<H160> {
	let bytes = hex::decode(value.trim_start_matches("0x"))
		.map_err(|err| anyhow::anyhow!("malformed address {value}: {err}"))?;
	if bytes.len() != 20 {
		anyhow::bail!("address {value} is not 20 bytes");
	}
	Ok(H160::from_slice(&bytes))
}

fn parse_selector(value: &str) -> anyhow::Result<[u8; 4]> {
	let bytes = hex::decode(value.trim_start_matches("0x"))
		.map_err(|err| anyhow::anyhow!("malformed selector {value}: {err}"))?;
	bytes
		.try_into()
		.map_err(|bytes: Vec<u8>| anyhow::anyhow!("selector must be 4 bytes, got {}", bytes.len()))
}

#[derive(Debug, Deserialize, Clone)]
pub struct SupervisorConfig {
	#[serde(default = "default_max_restarts")]
	pub max_restarts: u32,
}

impl Default for SupervisorConfig {
	fn default() -> Self {
		SupervisorConfig { max_restarts: default_max_restarts() }
	}
}

fn default_start_height() -> u64 {
	0
}

fn default_chunk_size() -> usize {
	10
}

fn default_beefy_poll_interval_secs() -> u64 {
	60
}

fn default_max_restarts() -> u32 {
	5
}

impl Config {
	pub fn load(path: &Path) -> anyhow::Result<Self> {
		let raw = std::fs::read_to_string(path)
			.map_err(|err| anyhow::anyhow!("failed to read config file {}: {err}", path.display()))?;
		let mut config: Config = serde_yaml::from_str(&raw)
			.map_err(|err| anyhow::anyhow!("failed to parse config file {}: {err}", path.display()))?;
		config.apply_env_overrides();
		Ok(config)
	}

	/// `ARTEMIS_{ETHEREUM,PARACHAIN,RELAYCHAIN}_ENDPOINT` override the
	/// matching endpoint; `ARTEMIS_{ETHEREUM,PARACHAIN}_KEY` override the
	/// matching signing key.
	fn apply_env_overrides(&mut self) {
		if let Ok(endpoint) = std::env::var("ARTEMIS_ETHEREUM_ENDPOINT") {
			self.ethereum.endpoint = endpoint;
		}
		if let Ok(endpoint) = std::env::var("ARTEMIS_PARACHAIN_ENDPOINT") {
			self.parachain.endpoint = endpoint;
		}
		if let Ok(endpoint) = std::env::var("ARTEMIS_RELAYCHAIN_ENDPOINT") {
			self.relaychain.endpoint = endpoint;
		}
		if let Ok(key) = std::env::var("ARTEMIS_ETHEREUM_KEY") {
			self.ethereum.private_key = Some(key);
		}
		if let Ok(key) = std::env::var("ARTEMIS_PARACHAIN_KEY") {
			self.parachain.private_key = Some(key);
		}
	}
}
