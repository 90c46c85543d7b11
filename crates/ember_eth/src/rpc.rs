//! The `eth_getBlockBy*` JSON wire forms and their conversions.

use ember_forks::ChainConfig;
use ember_primitives::{Address, Bloom, Bytes, TxKind, B256, B64, U256};
use serde::{Deserialize, Serialize};

use crate::{
    access_list::AccessListItem,
    block::{Block as LocalBlock, BlockCreationError},
    header::{BlobGas, BlockConfig, FrozenHeader, HeaderData},
    transaction,
    withdrawal::Withdrawal,
};

/// block object returned by `eth_getBlockBy*`
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Block<TransactionT> {
    /// Hash of the block
    pub hash: Option<B256>,
    /// hash of the parent block.
    pub parent_hash: B256,
    /// SHA3 of the uncles data in the block
    pub sha3_uncles: B256,
    /// the root of the final state trie of the block
    pub state_root: B256,
    /// the root of the transaction trie of the block
    pub transactions_root: B256,
    /// the root of the receipts trie of the block
    pub receipts_root: B256,
    /// the block number. None when its pending block.
    #[serde(with = "alloy_serde::quantity::opt")]
    pub number: Option<u64>,
    /// the total used gas by all transactions in this block
    #[serde(with = "alloy_serde::quantity")]
    pub gas_used: u64,
    /// the maximum gas allowed in this block
    #[serde(with = "alloy_serde::quantity")]
    pub gas_limit: u64,
    /// the "extra data" field of this block
    pub extra_data: Bytes,
    /// the bloom filter for the logs of the block
    pub logs_bloom: Bloom,
    /// the unix timestamp for when the block was collated
    #[serde(with = "alloy_serde::quantity")]
    pub timestamp: u64,
    /// integer of the difficulty for this block
    pub difficulty: U256,
    /// Array of uncle hashes
    #[serde(default)]
    pub uncles: Vec<B256>,
    /// Array of transaction objects, or 32 Bytes transaction hashes depending
    /// on the last given parameter
    #[serde(default)]
    pub transactions: Vec<TransactionT>,
    /// Mix hash. None when it's a pending block.
    pub mix_hash: Option<B256>,
    /// hash of the generated proof-of-work. null when its pending block.
    pub nonce: Option<B64>,
    /// base fee per gas
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "alloy_serde::quantity::opt"
    )]
    pub base_fee_per_gas: Option<u128>,
    /// the address of the beneficiary to whom the mining rewards were given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub miner: Option<Address>,
    /// withdrawals
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub withdrawals: Option<Vec<Withdrawal>>,
    /// withdrawals root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub withdrawals_root: Option<B256>,
    /// The total amount of blob gas used by the transactions.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "alloy_serde::quantity::opt"
    )]
    pub blob_gas_used: Option<u64>,
    /// A running total of blob gas consumed in excess of the target, prior to
    /// the block.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "alloy_serde::quantity::opt"
    )]
    pub excess_blob_gas: Option<u64>,
    /// Root of the parent beacon block
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_beacon_block_root: Option<B256>,
    /// The commitment hash calculated for a list of [EIP-7685] data requests.
    ///
    /// [EIP-7685]: https://eips.ethereum.org/EIPS/eip-7685
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requests_hash: Option<B256>,
}

/// transaction object returned by `eth_getTransactionBy*`
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// hash of the transaction
    pub hash: B256,
    /// the number of transactions made by the sender prior to this one
    #[serde(with = "alloy_serde::quantity")]
    pub nonce: u64,
    /// address of the receiver. null when it's a contract creation
    /// transaction.
    pub to: Option<Address>,
    /// value transferred in Wei
    pub value: U256,
    /// gas price provided by the sender in Wei
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "alloy_serde::quantity::opt"
    )]
    pub gas_price: Option<u128>,
    /// gas provided by the sender
    #[serde(with = "alloy_serde::quantity")]
    pub gas: u64,
    /// the data sent along with the transaction
    pub input: Bytes,
    /// the transaction type, absent for legacy transactions
    #[serde(
        default,
        rename = "type",
        skip_serializing_if = "Option::is_none",
        with = "alloy_serde::quantity::opt"
    )]
    pub transaction_type: Option<u8>,
    /// chain ID
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "alloy_serde::quantity::opt"
    )]
    pub chain_id: Option<u64>,
    /// access list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_list: Option<Vec<AccessListItem>>,
    /// max fee per gas
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "alloy_serde::quantity::opt"
    )]
    pub max_fee_per_gas: Option<u128>,
    /// max priority fee per gas
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "alloy_serde::quantity::opt"
    )]
    pub max_priority_fee_per_gas: Option<u128>,
    /// max fee per blob gas
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "alloy_serde::quantity::opt"
    )]
    pub max_fee_per_blob_gas: Option<u128>,
    /// blob versioned hashes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob_versioned_hashes: Option<Vec<B256>>,
    /// the authorizations carried by a set-code transaction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_list: Option<Vec<transaction::Authorization>>,
    /// signature V or Y-parity value
    #[serde(with = "alloy_serde::quantity")]
    pub v: u64,
    /// signature R value
    pub r: U256,
    /// signature S value
    pub s: U256,
}

/// Error that occurs when trying to convert the JSON-RPC types into local
/// ones.
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    /// Missing miner
    #[error("missing miner")]
    Miner,
    /// Missing mix hash
    #[error("missing mix hash")]
    MixHash,
    /// Missing nonce
    #[error("missing nonce")]
    Nonce,
    /// Missing number
    #[error("missing number")]
    Number,
    /// Missing recipient
    #[error("missing recipient for a transaction type that requires one")]
    Recipient,
    /// Missing gas price
    #[error("missing gas price")]
    GasPrice,
    /// Missing max fee per gas
    #[error("missing max fee per gas")]
    MaxFeePerGas,
    /// An unknown transaction type
    #[error("unknown transaction type: {0}")]
    UnknownType(u8),
    /// The converted block failed validation.
    #[error(transparent)]
    Block(#[from] BlockCreationError),
}

impl TryFrom<Transaction> for transaction::Signed {
    type Error = ConversionError;

    fn try_from(value: Transaction) -> Result<Self, Self::Error> {
        let kind = value.to.map_or(TxKind::Create, TxKind::Call);
        let to = || value.to.ok_or(ConversionError::Recipient);
        let gas_price = || value.gas_price.ok_or(ConversionError::GasPrice);
        let max_fee = || value.max_fee_per_gas.ok_or(ConversionError::MaxFeePerGas);

        let signed = match value.transaction_type.unwrap_or(0) {
            0 => transaction::Signed::Legacy(transaction::Legacy {
                nonce: value.nonce,
                gas_price: gas_price()?,
                gas_limit: value.gas,
                kind,
                value: value.value,
                input: value.input,
                v: value.v,
                r: value.r,
                s: value.s,
            }),
            1 => transaction::Signed::Eip2930(transaction::Eip2930 {
                chain_id: value.chain_id.unwrap_or(1),
                nonce: value.nonce,
                gas_price: gas_price()?,
                gas_limit: value.gas,
                kind,
                value: value.value,
                input: value.input,
                access_list: value.access_list.unwrap_or_default(),
                odd_y_parity: value.v == 1,
                r: value.r,
                s: value.s,
            }),
            2 => transaction::Signed::Eip1559(transaction::Eip1559 {
                chain_id: value.chain_id.unwrap_or(1),
                nonce: value.nonce,
                max_priority_fee_per_gas: value.max_priority_fee_per_gas.unwrap_or_default(),
                max_fee_per_gas: max_fee()?,
                gas_limit: value.gas,
                kind,
                value: value.value,
                input: value.input,
                access_list: value.access_list.unwrap_or_default(),
                odd_y_parity: value.v == 1,
                r: value.r,
                s: value.s,
            }),
            3 => transaction::Signed::Eip4844(transaction::Eip4844 {
                chain_id: value.chain_id.unwrap_or(1),
                nonce: value.nonce,
                max_priority_fee_per_gas: value.max_priority_fee_per_gas.unwrap_or_default(),
                max_fee_per_gas: max_fee()?,
                gas_limit: value.gas,
                to: to()?,
                value: value.value,
                input: value.input,
                access_list: value.access_list.unwrap_or_default(),
                max_fee_per_blob_gas: value.max_fee_per_blob_gas.unwrap_or_default(),
                blob_versioned_hashes: value.blob_versioned_hashes.unwrap_or_default(),
                odd_y_parity: value.v == 1,
                r: value.r,
                s: value.s,
            }),
            4 => transaction::Signed::Eip7702(transaction::Eip7702 {
                chain_id: value.chain_id.unwrap_or(1),
                nonce: value.nonce,
                max_priority_fee_per_gas: value.max_priority_fee_per_gas.unwrap_or_default(),
                max_fee_per_gas: max_fee()?,
                gas_limit: value.gas,
                to: to()?,
                value: value.value,
                input: value.input,
                access_list: value.access_list.unwrap_or_default(),
                authorization_list: value.authorization_list.unwrap_or_default(),
                odd_y_parity: value.v == 1,
                r: value.r,
                s: value.s,
            }),
            unknown => return Err(ConversionError::UnknownType(unknown)),
        };

        Ok(signed)
    }
}

impl Block<Transaction> {
    /// Converts the remote form into a validated local block.
    ///
    /// Remote blocks only carry their uncle headers' hashes, so the uncle
    /// hash consistency check is limited to blocks without uncles.
    pub fn into_block(self, chain: &ChainConfig) -> Result<LocalBlock, ConversionError> {
        let number = self.number.ok_or(ConversionError::Number)?;
        let config = BlockConfig::at_block(chain, number, self.timestamp);

        let header_data = HeaderData {
            parent_hash: Some(self.parent_hash),
            ommers_hash: Some(self.sha3_uncles),
            beneficiary: Some(self.miner.ok_or(ConversionError::Miner)?),
            state_root: Some(self.state_root),
            transactions_root: Some(self.transactions_root),
            receipts_root: Some(self.receipts_root),
            logs_bloom: Some(self.logs_bloom),
            difficulty: Some(self.difficulty),
            number: Some(number),
            gas_limit: Some(self.gas_limit),
            gas_used: Some(self.gas_used),
            timestamp: Some(self.timestamp),
            extra_data: Some(self.extra_data),
            mix_hash: Some(self.mix_hash.ok_or(ConversionError::MixHash)?),
            nonce: Some(self.nonce.ok_or(ConversionError::Nonce)?),
            base_fee_per_gas: self.base_fee_per_gas,
            withdrawals_root: self.withdrawals_root,
            blob_gas: match (self.blob_gas_used, self.excess_blob_gas) {
                (Some(gas_used), Some(excess_gas)) => Some(BlobGas {
                    gas_used,
                    excess_gas,
                }),
                _ => None,
            },
            parent_beacon_block_root: self.parent_beacon_block_root,
            requests_hash: self.requests_hash,
        };
        let header = FrozenHeader::from_header(header_data.into_header(&config), &config)
            .map_err(BlockCreationError::from)?;

        let transactions = self
            .transactions
            .into_iter()
            .map(transaction::Signed::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        if self.uncles.is_empty() {
            Ok(LocalBlock::new(
                header,
                transactions,
                Vec::new(),
                self.withdrawals,
                &config,
            )?)
        } else {
            log::debug!(
                "block {number} has {} uncles known only by hash; skipping uncle hash check",
                self.uncles.len()
            );

            LocalBlock::new_with_unverified_ommer_hash(
                header,
                transactions,
                self.withdrawals,
                &config,
            )
            .map_err(ConversionError::from)
        }
    }
}

#[cfg(test)]
mod tests {
    use ember_forks::chains::mainnet_config;

    use super::*;

    const BLOCK_JSON: &str = r#"{
        "hash": "0x1df41b055ad74759dbd5a2e69866502a12adcbcd167e42a56a6d59b11087f25e",
        "parentHash": "0x41f266358c6670e87bb1b26440f2f381db168d1b9b4cab4b12c1ab04084dde0b",
        "sha3Uncles": "0x1dcc4de8dec75d7aab85b567b6ccd41ad312451b948a7413f0a142fd40d49347",
        "miner": "0x95222290dd7278aa3ddd389cc1e1d165cc4bafe5",
        "stateRoot": "0xf6825ade2a6c4ccd9cd3469998aea53132dd57ec83f05150b2e2ccdfd203d9b4",
        "transactionsRoot": "0x56e81f171bcc55a6ff8345e692c0f86e5b48e01b996cadc001622fb5e363b421",
        "receiptsRoot": "0x56e81f171bcc55a6ff8345e692c0f86e5b48e01b996cadc001622fb5e363b421",
        "logsBloom": "0x00000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000",
        "difficulty": "0x0",
        "number": "0x112a880",
        "gasLimit": "0x1c9c380",
        "gasUsed": "0x0",
        "timestamp": "0x65156994",
        "extraData": "0x",
        "mixHash": "0x7bb1a02e29a857a8354b64c419eecad09c4c0a1ccbfa5dde2e2c8f2764f3e938",
        "nonce": "0x0000000000000000",
        "baseFeePerGas": "0x7",
        "withdrawalsRoot": "0x56e81f171bcc55a6ff8345e692c0f86e5b48e01b996cadc001622fb5e363b421",
        "withdrawals": [],
        "uncles": [],
        "transactions": []
    }"#;

    #[test]
    fn block_json_round_trip() {
        let block: Block<Transaction> = serde_json::from_str(BLOCK_JSON).unwrap();
        assert_eq!(block.number, Some(0x112a880));
        assert_eq!(block.base_fee_per_gas, Some(7));

        let json = serde_json::to_string(&block).unwrap();
        let reparsed: Block<Transaction> = serde_json::from_str(&json).unwrap();
        assert_eq!(block, reparsed);
    }

    #[test]
    fn converts_remote_block() {
        let block: Block<Transaction> = serde_json::from_str(BLOCK_JSON).unwrap();

        let local = block.into_block(mainnet_config()).unwrap();
        assert_eq!(local.header().number, 0x112a880);
        assert_eq!(local.transactions().len(), 0);
        assert!(local.withdrawals_trie_is_valid());
    }

    #[test]
    fn missing_nonce_is_reported() {
        let mut block: Block<Transaction> = serde_json::from_str(BLOCK_JSON).unwrap();
        block.nonce = None;

        assert!(matches!(
            block.into_block(mainnet_config()),
            Err(ConversionError::Nonce)
        ));
    }
}
