//! Ethereum withdrawal type

use alloy_rlp::{RlpDecodable, RlpEncodable};
use ember_primitives::{Address, U256};

/// A validator withdrawal pushed into the execution layer (EIP-4895).
#[derive(Clone, Debug, PartialEq, Eq, RlpDecodable, RlpEncodable)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Withdrawal {
    /// The index of withdrawal
    #[serde(with = "alloy_serde::quantity")]
    pub index: u64,
    /// The index of the validator that generated the withdrawal
    #[serde(with = "alloy_serde::quantity")]
    pub validator_index: u64,
    /// The recipient address for withdrawal value
    pub address: Address,
    /// The value contained in withdrawal, in gwei
    pub amount: U256,
}

/// Computes the withdrawals trie root of the provided list.
pub fn withdrawals_root(withdrawals: &[Withdrawal]) -> ember_primitives::B256 {
    ember_trie::ordered_rlp_trie_root(withdrawals)
}
