//! Engine-API execution payloads.

use ember_forks::ChainConfig;
use ember_primitives::{Address, Bloom, Bytes, B256, B64, U256};
use ember_trie::ordered_trie_root;
use serde::{Deserialize, Serialize};

use crate::{
    block::{Block, BlockCreationError},
    header::{BlobGas, BlockConfig, FrozenHeader, HeaderData},
    transaction::{Signed, TransactionError},
    withdrawal::{withdrawals_root, Withdrawal},
};

/// An execution payload, as handed over by a consensus client.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionPayload {
    /// Hash of the parent block.
    pub parent_hash: B256,
    /// The block's beneficiary.
    pub fee_recipient: Address,
    /// The state root after execution.
    pub state_root: B256,
    /// The receipts root.
    pub receipts_root: B256,
    /// The logs bloom.
    pub logs_bloom: Bloom,
    /// The randomness beacon value carried in the mix-hash slot.
    pub prev_randao: B256,
    /// The block number.
    #[serde(with = "alloy_serde::quantity")]
    pub block_number: u64,
    /// The block's gas limit.
    #[serde(with = "alloy_serde::quantity")]
    pub gas_limit: u64,
    /// The gas used by the block.
    #[serde(with = "alloy_serde::quantity")]
    pub gas_used: u64,
    /// The block's timestamp.
    #[serde(with = "alloy_serde::quantity")]
    pub timestamp: u64,
    /// The block's extra data.
    pub extra_data: Bytes,
    /// The block's base fee.
    pub base_fee_per_gas: U256,
    /// The hash of the block the payload describes.
    pub block_hash: B256,
    /// The raw wire bytes of the block's transactions.
    pub transactions: Vec<Bytes>,
    /// The block's withdrawals, EIP-4895 onwards.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub withdrawals: Option<Vec<Withdrawal>>,
    /// Blob gas used, EIP-4844 onwards.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "alloy_serde::quantity::opt"
    )]
    pub blob_gas_used: Option<u64>,
    /// Excess blob gas, EIP-4844 onwards.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "alloy_serde::quantity::opt"
    )]
    pub excess_blob_gas: Option<u64>,
    /// The parent beacon block root, EIP-4788 onwards.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_beacon_block_root: Option<B256>,
    /// The requests commitment, EIP-7685 onwards.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requests_hash: Option<B256>,
}

/// An execution payload that does not describe a valid block.
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    /// The computed header hash disagrees with the payload.
    #[error("invalid blockHash, expected {expected}, computed {computed}")]
    BlockHashMismatch {
        /// Hash claimed by the payload.
        expected: B256,
        /// Hash of the computed header.
        computed: B256,
    },
    /// A transaction envelope failed to decode.
    #[error(transparent)]
    Transaction(#[from] TransactionError),
    /// The assembled block failed validation.
    #[error(transparent)]
    Block(#[from] BlockCreationError),
}

impl ExecutionPayload {
    /// Assembles and validates the block the payload describes. The
    /// transaction and withdrawal trie roots are recomputed from the payload
    /// contents, and the resulting header hash must equal the payload's
    /// `blockHash`.
    pub fn into_block(self, chain: &ChainConfig) -> Result<Block, PayloadError> {
        let config = BlockConfig::at_block(chain, self.block_number, self.timestamp);

        let transactions = self
            .transactions
            .iter()
            .map(|raw| Signed::from_raw_bytes(raw))
            .collect::<Result<Vec<_>, _>>()?;

        let transactions_root = ordered_trie_root(self.transactions.iter());
        let withdrawals_root = self
            .withdrawals
            .as_deref()
            .map(withdrawals_root);

        let header_data = HeaderData {
            parent_hash: Some(self.parent_hash),
            beneficiary: Some(self.fee_recipient),
            state_root: Some(self.state_root),
            transactions_root: Some(transactions_root),
            receipts_root: Some(self.receipts_root),
            logs_bloom: Some(self.logs_bloom),
            difficulty: Some(U256::ZERO),
            number: Some(self.block_number),
            gas_limit: Some(self.gas_limit),
            gas_used: Some(self.gas_used),
            timestamp: Some(self.timestamp),
            extra_data: Some(self.extra_data),
            mix_hash: Some(self.prev_randao),
            nonce: Some(B64::ZERO),
            base_fee_per_gas: Some(self.base_fee_per_gas.to::<u128>()),
            withdrawals_root,
            blob_gas: match (self.blob_gas_used, self.excess_blob_gas) {
                (Some(gas_used), Some(excess_gas)) => Some(BlobGas {
                    gas_used,
                    excess_gas,
                }),
                _ => None,
            },
            parent_beacon_block_root: self.parent_beacon_block_root,
            requests_hash: self.requests_hash,
            ..HeaderData::default()
        };

        let header = FrozenHeader::from_header(header_data.into_header(&config), &config)
            .map_err(BlockCreationError::from)?;

        let computed = header.hash();
        if computed != self.block_hash {
            return Err(PayloadError::BlockHashMismatch {
                expected: self.block_hash,
                computed,
            });
        }

        Ok(Block::new(
            header,
            transactions,
            Vec::new(),
            self.withdrawals,
            &config,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use ember_forks::chains::mainnet_config;
    use ember_trie::KECCAK_NULL_RLP;

    use super::*;

    fn shanghai_payload() -> ExecutionPayload {
        ExecutionPayload {
            parent_hash: B256::repeat_byte(0x01),
            fee_recipient: Address::repeat_byte(0x02),
            state_root: B256::repeat_byte(0x03),
            receipts_root: KECCAK_NULL_RLP,
            logs_bloom: Bloom::ZERO,
            prev_randao: B256::repeat_byte(0x04),
            block_number: 17_034_870,
            gas_limit: 30_000_000,
            gas_used: 0,
            timestamp: 1_681_338_455,
            extra_data: Bytes::new(),
            base_fee_per_gas: U256::from(7u64),
            block_hash: B256::ZERO,
            transactions: Vec::new(),
            withdrawals: Some(Vec::new()),
            ..ExecutionPayload::default()
        }
    }

    #[test]
    fn accepts_matching_block_hash() {
        let chain = mainnet_config();
        let mut payload = shanghai_payload();

        // First conversion reports the expected hash; a payload carrying it
        // converts cleanly.
        let Err(PayloadError::BlockHashMismatch { computed, .. }) =
            payload.clone().into_block(chain)
        else {
            panic!("zero block hash must not match");
        };

        payload.block_hash = computed;
        let block = payload.into_block(chain).unwrap();

        assert_eq!(block.hash(), computed);
        assert_eq!(block.withdrawals(), Some(&[] as &[Withdrawal]));
    }

    #[test]
    fn payload_json_round_trip() {
        let payload = shanghai_payload();

        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("\"prevRandao\""));

        let reparsed: ExecutionPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(payload, reparsed);
    }
}
