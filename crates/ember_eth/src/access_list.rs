//! EIP-2930 access list types

use alloy_rlp::{RlpDecodable, RlpEncodable};
use ember_primitives::{Address, B256};

/// A list of addresses and storage keys a transaction declares up front.
pub type AccessList = Vec<AccessListItem>;

/// A single access-list entry.
#[derive(Clone, Debug, Default, PartialEq, Eq, RlpDecodable, RlpEncodable)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessListItem {
    /// The declared address.
    pub address: Address,
    /// The declared storage keys of that address.
    pub storage_keys: Vec<B256>,
}
