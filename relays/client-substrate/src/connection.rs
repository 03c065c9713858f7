//! C1 (parachain/relay-chain side): connection seam. Thin over the node's
//! JSON-RPC surface, same rationale as `relay-ethereum-client::connection`
//! — wire framing and keystore are out of core scope, but the pool and
//! writer need a concrete way to submit and watch extrinsics.

use async_trait::async_trait;
use futures::channel::mpsc::UnboundedReceiver;
use futures::stream::StreamExt;
use jsonrpsee::core::client::{ClientT, SubscriptionClientT};
use jsonrpsee::rpc_params;
use jsonrpsee::ws_client::{WsClient, WsClientBuilder};
use relay_types::{H256, U256};

use crate::error::Error;
use crate::status::TransactionStatus;

#[async_trait]
pub trait SubstrateRpc: Send + Sync {
	/// Submits a signed, SCALE-encoded extrinsic and returns a stream of
	/// its status updates; dropping the stream unsubscribes.
	async fn submit_and_watch(
		&self,
		extrinsic: Vec<u8>,
	) -> Result<UnboundedReceiver<TransactionStatus>, Error>;

	/// `System.Account` nonce for the signer.
	async fn account_nonce(&self, account: &[u8]) -> Result<u64, Error>;

	/// `Chain.GetBlockHash(0)`.
	async fn genesis_hash(&self) -> Result<H256, Error>;

	async fn best_finalized_header_number(&self) -> Result<u64, Error>;
}

pub struct SubstrateConnection {
	client: WsClient,
}

impl SubstrateConnection {
	pub async fn connect(url: &str) -> Result<Self, Error> {
		let client = WsClientBuilder::default().build(url).await?;
		Ok(SubstrateConnection { client })
	}
}

#[async_trait]
impl SubstrateRpc for SubstrateConnection {
	async fn submit_and_watch(
		&self,
		extrinsic: Vec<u8>,
	) -> Result<UnboundedReceiver<TransactionStatus>, Error> {
		let mut subscription = self
			.client
			.subscribe::<serde_json::Value, _>(
				"author_submitAndWatchExtrinsic",
				rpc_params![hex::encode(&extrinsic)],
				"author_unwatchExtrinsic",
			)
			.await?;

		let (tx, rx) = futures::channel::mpsc::unbounded();
		async_std::task::spawn(async move {
			while let Some(Ok(status)) = subscription.next().await {
				let tag = status_tag(&status);
				if tx.unbounded_send(TransactionStatus::from_rpc_tag(&tag)).is_err() {
					break;
				}
			}
		});
		Ok(rx)
	}

	async fn account_nonce(&self, account: &[u8]) -> Result<u64, Error> {
		let nonce: U256 = self
			.client
			.request("system_accountNextIndex", rpc_params![hex::encode(account)])
			.await?;
		Ok(nonce.as_u64())
	}

	async fn genesis_hash(&self) -> Result<H256, Error> {
		let hash: H256 = self.client.request("chain_getBlockHash", rpc_params![0]).await?;
		Ok(hash)
	}

	async fn best_finalized_header_number(&self) -> Result<u64, Error> {
		let hash: H256 = self.client.request("chain_getFinalizedHead", rpc_params![]).await?;
		let header: serde_json::Value =
			self.client.request("chain_getHeader", rpc_params![hash]).await?;
		let number = header
			.get("number")
			.and_then(|v| v.as_str())
			.and_then(|s| u64::from_str_radix(s.trim_start_matches("0x"), 16).ok())
			.ok_or_else(|| Error::Decode("header missing number".into()))?;
		Ok(number)
	}
}

/// The status JSON is a single-key object (`{"dropped": null}`,
/// `{"inBlock": "0x.."}`, or the bare string `"ready"`) depending on
/// variant; this extracts the tag either way.
fn status_tag(value: &serde_json::Value) -> String {
	match value {
		serde_json::Value::String(s) => s.to_ascii_lowercase(),
		serde_json::Value::Object(map) => map
			.keys()
			.next()
			.map(|k| k.to_ascii_lowercase())
			.unwrap_or_default(),
		_ => String::new(),
	}
}
