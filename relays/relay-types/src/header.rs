use codec::{Decode, Encode};
use scale_info::TypeInfo;

/// A header carried in-band to the destination chain's light client.
///
/// `header_data` and `proof_data` are opaque from this crate's point of
/// view: the Ethereum side carries an RLP-encoded block header plus a
/// receipts-root witness, the parachain side carries a SCALE-encoded
/// `sp_runtime::generic::Header` plus a GRANDPA/BEEFY justification. Only
/// the destination light client needs to understand the bytes.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode, TypeInfo)]
pub struct Header {
	pub header_data: Vec<u8>,
	pub proof_data: Vec<u8>,
}

impl Header {
	pub fn new(header_data: Vec<u8>, proof_data: Vec<u8>) -> Self {
		Header { header_data, proof_data }
	}
}
