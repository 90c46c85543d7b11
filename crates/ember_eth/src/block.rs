use alloy_rlp::{Decodable, Encodable};
use ember_forks::{ChainConfig, ConsensusType};
use ember_primitives::{keccak256, Bytes, B256};
use ember_trie::ordered_trie_root;

use crate::{
    fees::{blob_gas_price, calc_next_excess_blob_gas},
    header::{BlockConfig, FrozenHeader, Header, HeaderValidationError},
    transaction::{Signed, TransactionError},
    withdrawal::{withdrawals_root, Withdrawal},
    HeaderBuildOptions, HeaderData,
};

/// A structurally invalid block.
#[derive(Debug, thiserror::Error)]
pub enum BlockCreationError {
    /// More than two uncle headers.
    #[error("too many uncle headers")]
    TooManyUncles,
    /// Two uncles with the same hash.
    #[error("duplicate uncles")]
    DuplicateUncles,
    /// Uncles under a consensus algorithm without uncle rewards.
    #[error("uncle headers are not allowed under the block's consensus algorithm")]
    UnclesForbidden,
    /// A withdrawals list before its EIP activated.
    #[error("Cannot have a withdrawals field if EIP 4895 is not active")]
    WithdrawalsBeforeEip4895,
    /// Blob data before its EIP activated.
    #[error("Cannot have blob transactions if EIP 4844 is not active")]
    BlobTransactionsBeforeEip4844,
    /// The encoded block exceeds the protocol cap.
    #[error("invalid block: RLP size {actual} exceeds the maximum of {max}")]
    RlpSizeExceeded {
        /// The configured maximum.
        max: u64,
        /// The encoded size.
        actual: u64,
    },
    /// The transactions trie root does not match the header.
    #[error("invalid transaction trie: computed {computed}, header has {expected}")]
    TransactionsTrieMismatch {
        /// Root over the block's transactions.
        computed: B256,
        /// Root claimed by the header.
        expected: B256,
    },
    /// The uncle hash does not match the header.
    #[error("invalid uncle hash: computed {computed}, header has {expected}")]
    UncleHashMismatch {
        /// Hash over the block's uncle headers.
        computed: B256,
        /// Hash claimed by the header.
        expected: B256,
    },
    /// The withdrawals trie root does not match the header.
    #[error("invalid withdrawals trie: computed {computed}, header has {expected}")]
    WithdrawalsTrieMismatch {
        /// Root over the block's withdrawals.
        computed: B256,
        /// Root claimed by the header.
        expected: B256,
    },
    /// The blob gas total of the block's transactions disagrees with the
    /// header.
    #[error("invalid block: blob gas used {computed} does not match header value {expected}")]
    BlobGasUsedMismatch {
        /// Total over the block's blob transactions.
        computed: u64,
        /// Value claimed by the header.
        expected: u64,
    },
    /// The blob gas total exceeds the per-block maximum.
    #[error("invalid block: blob gas used {used} exceeds the per-block maximum of {max}")]
    BlobGasExceedsMaximum {
        /// The configured maximum.
        max: u64,
        /// Total over the block's blob transactions.
        used: u64,
    },
    /// A pre-fee-market transaction cannot pay the block's base fee.
    #[error("transaction {index}: gasPrice {gas_price} is below the block's baseFeePerGas {base_fee}")]
    GasPriceBelowBaseFee {
        /// Index of the transaction in the block.
        index: usize,
        /// The transaction's gas price.
        gas_price: u128,
        /// The block's base fee.
        base_fee: u128,
    },
    /// A fee-market transaction cannot pay the block's base fee.
    #[error("transaction {index}: maxFeePerGas {max_fee} is below the block's baseFeePerGas {base_fee}")]
    MaxFeeBelowBaseFee {
        /// Index of the transaction in the block.
        index: usize,
        /// The transaction's maximum fee.
        max_fee: u128,
        /// The block's base fee.
        base_fee: u128,
    },
    /// A blob transaction cannot pay the blob gas price the parent implies.
    #[error(
        "transaction {index}: maxFeePerBlobGas {max_fee} is below the blob gas price {blob_gas_price}"
    )]
    MaxFeePerBlobGasTooLow {
        /// Index of the transaction in the block.
        index: usize,
        /// The transaction's maximum blob fee.
        max_fee: u128,
        /// The price implied by the parent header.
        blob_gas_price: u128,
    },
    /// The header's excess blob gas does not follow from the parent.
    #[error("invalid block: excessBlobGas {actual} does not match the expected {expected}")]
    ExcessBlobGasMismatch {
        /// Value following from the parent header.
        expected: u64,
        /// Value claimed by the header.
        actual: u64,
    },
    /// A block body with more than the known slots.
    #[error("invalid block body: expected at most {max} fields, got {actual}")]
    TooManyFields {
        /// Permitted slot count.
        max: usize,
        /// Provided slot count.
        actual: usize,
    },
    /// The header failed validation.
    #[error(transparent)]
    Header(#[from] HeaderValidationError),
    /// A transaction failed to decode.
    #[error(transparent)]
    Transaction(#[from] TransactionError),
    /// Malformed RLP.
    #[error(transparent)]
    Rlp(#[from] alloy_rlp::Error),
}

/// The caller-facing pieces of a block, resolved into a [`Block`] by
/// [`Block::new`].
#[derive(Clone, Debug, Default)]
pub struct BlockData {
    /// Header fields.
    pub header: HeaderData,
    /// The block's transactions.
    pub transactions: Vec<Signed>,
    /// The block's uncle headers.
    pub ommers: Vec<Header>,
    /// The block's withdrawals, EIP-4895 onwards.
    pub withdrawals: Option<Vec<Withdrawal>>,
}

/// A validated block: frozen header, transactions, uncle headers and
/// withdrawals.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    header: FrozenHeader,
    transactions: Vec<Signed>,
    ommers: Vec<Header>,
    withdrawals: Option<Vec<Withdrawal>>,
}

impl Block {
    /// Builds a block from its parts, checking every structural invariant.
    pub fn new(
        header: FrozenHeader,
        transactions: Vec<Signed>,
        ommers: Vec<Header>,
        withdrawals: Option<Vec<Withdrawal>>,
        config: &BlockConfig<'_>,
    ) -> Result<Self, BlockCreationError> {
        let withdrawals = validate_withdrawals_slot(withdrawals, config)?;
        validate_ommers(&ommers, config)?;

        let block = Self {
            header,
            transactions,
            ommers,
            withdrawals,
        };

        block.validate_transactions_trie()?;
        block.validate_uncle_hash()?;
        block.validate_withdrawals_trie()?;
        block.validate_blob_gas_totals(config)?;
        block.validate_transaction_fees(config)?;
        block.validate_rlp_size(config)?;

        log::debug!(
            "constructed block {} with {} transactions",
            block.header.number,
            block.transactions.len()
        );

        Ok(block)
    }

    /// Builds a block from caller-provided data, validating the header along
    /// the way.
    pub fn from_block_data(
        data: BlockData,
        config: &BlockConfig<'_>,
        options: HeaderBuildOptions<'_>,
    ) -> Result<Self, BlockCreationError> {
        let header = FrozenHeader::new(data.header, config, options)?;

        Self::new(
            header,
            data.transactions,
            data.ommers,
            data.withdrawals,
            config,
        )
    }

    /// Builds a block whose uncle headers are known only by hash, skipping
    /// the uncle hash consistency check. Every other structural invariant is
    /// still enforced.
    pub fn new_with_unverified_ommer_hash(
        header: FrozenHeader,
        transactions: Vec<Signed>,
        withdrawals: Option<Vec<Withdrawal>>,
        config: &BlockConfig<'_>,
    ) -> Result<Self, BlockCreationError> {
        let withdrawals = validate_withdrawals_slot(withdrawals, config)?;

        let block = Self {
            header,
            transactions,
            ommers: Vec::new(),
            withdrawals,
        };

        block.validate_transactions_trie()?;
        block.validate_withdrawals_trie()?;
        block.validate_blob_gas_totals(config)?;
        block.validate_transaction_fees(config)?;
        block.validate_rlp_size(config)?;

        Ok(block)
    }

    /// Decodes a block from its RLP form. The hardfork is resolved from the
    /// decoded header's number and timestamp.
    pub fn from_rlp(bytes: &[u8], chain: &ChainConfig) -> Result<Self, BlockCreationError> {
        let mut buf = bytes;
        let outer = alloy_rlp::Header::decode(&mut buf)?;
        if !outer.list {
            return Err(alloy_rlp::Error::UnexpectedString.into());
        }
        let mut payload = &buf[..outer.payload_length];

        let header = Header::decode(&mut payload)?;
        let transactions = Vec::<Signed>::decode(&mut payload)?;
        let ommers = Vec::<Header>::decode(&mut payload)?;
        let withdrawals = if payload.is_empty() {
            None
        } else {
            Some(Vec::<Withdrawal>::decode(&mut payload)?)
        };
        if !payload.is_empty() {
            return Err(BlockCreationError::TooManyFields { max: 4, actual: 5 });
        }

        let config = BlockConfig::at_block(chain, header.number, header.timestamp);
        let header = FrozenHeader::from_header(header, &config)?;

        Self::new(header, transactions, ommers, withdrawals, &config)
    }

    /// The block's hash, memoized on the frozen header.
    pub fn hash(&self) -> B256 {
        self.header.hash()
    }

    /// The block's header.
    pub fn header(&self) -> &FrozenHeader {
        &self.header
    }

    /// The block's transactions.
    pub fn transactions(&self) -> &[Signed] {
        &self.transactions
    }

    /// The block's uncle headers.
    pub fn ommers(&self) -> &[Header] {
        &self.ommers
    }

    /// The hashes of the block's uncle headers.
    pub fn ommer_hashes(&self) -> Vec<B256> {
        self.ommers.iter().map(Header::hash).collect()
    }

    /// The block's withdrawals.
    pub fn withdrawals(&self) -> Option<&[Withdrawal]> {
        self.withdrawals.as_deref()
    }

    /// The RLP encoding of the block.
    pub fn serialized(&self) -> Vec<u8> {
        alloy_rlp::encode(self)
    }

    /// The length of the RLP encoding of this block in bytes.
    pub fn rlp_size(&self) -> u64 {
        self.length() as u64
    }

    /// Whether the header's transactions root matches the block's
    /// transactions.
    pub fn transactions_trie_is_valid(&self) -> bool {
        self.computed_transactions_root() == self.header.transactions_root
    }

    /// Whether the header's uncle hash matches the block's uncle headers.
    pub fn uncle_hash_is_valid(&self) -> bool {
        self.computed_uncle_hash() == self.header.ommers_hash
    }

    /// Whether the header's withdrawals root matches the block's
    /// withdrawals. Blocks without a withdrawals list are vacuously valid.
    pub fn withdrawals_trie_is_valid(&self) -> bool {
        match (&self.withdrawals, self.header.withdrawals_root) {
            (Some(withdrawals), Some(expected)) => withdrawals_root(withdrawals) == expected,
            (None, None) => true,
            _ => false,
        }
    }

    fn computed_transactions_root(&self) -> B256 {
        ordered_trie_root(
            self.transactions
                .iter()
                .map(|transaction| transaction.to_raw_bytes()),
        )
    }

    fn computed_uncle_hash(&self) -> B256 {
        keccak256(alloy_rlp::encode(&self.ommers))
    }

    fn validate_transactions_trie(&self) -> Result<(), BlockCreationError> {
        let computed = self.computed_transactions_root();
        if computed != self.header.transactions_root {
            return Err(BlockCreationError::TransactionsTrieMismatch {
                computed,
                expected: self.header.transactions_root,
            });
        }

        Ok(())
    }

    fn validate_uncle_hash(&self) -> Result<(), BlockCreationError> {
        let computed = self.computed_uncle_hash();
        if computed != self.header.ommers_hash {
            return Err(BlockCreationError::UncleHashMismatch {
                computed,
                expected: self.header.ommers_hash,
            });
        }

        Ok(())
    }

    fn validate_withdrawals_trie(&self) -> Result<(), BlockCreationError> {
        if let (Some(withdrawals), Some(expected)) =
            (&self.withdrawals, self.header.withdrawals_root)
        {
            let computed = withdrawals_root(withdrawals);
            if computed != expected {
                return Err(BlockCreationError::WithdrawalsTrieMismatch { computed, expected });
            }
        }

        Ok(())
    }

    fn validate_blob_gas_totals(&self, config: &BlockConfig<'_>) -> Result<(), BlockCreationError> {
        let blob_gas_per_blob = config.param("blobGasPerBlob").unwrap_or(131_072);
        let used: u64 = self
            .transactions
            .iter()
            .map(|transaction| {
                transaction.blob_versioned_hashes().len() as u64 * blob_gas_per_blob
            })
            .sum();

        if !config.is_eip_active(4844) {
            return if used == 0 {
                Ok(())
            } else {
                Err(BlockCreationError::BlobTransactionsBeforeEip4844)
            };
        }

        let max = config.param("maxBlobGasPerBlock").unwrap_or(786_432);
        if used > max {
            return Err(BlockCreationError::BlobGasExceedsMaximum { max, used });
        }

        let expected = self
            .header
            .blob_gas
            .as_ref()
            .map_or(0, |blob_gas| blob_gas.gas_used);
        if used != expected {
            return Err(BlockCreationError::BlobGasUsedMismatch {
                computed: used,
                expected,
            });
        }

        Ok(())
    }

    fn validate_transaction_fees(
        &self,
        config: &BlockConfig<'_>,
    ) -> Result<(), BlockCreationError> {
        if !config.is_eip_active(1559) {
            return Ok(());
        }
        let Some(base_fee) = self.header.base_fee_per_gas else {
            return Ok(());
        };

        for (index, transaction) in self.transactions.iter().enumerate() {
            if let Some(max_fee) = transaction.max_fee_per_gas() {
                if max_fee < base_fee {
                    return Err(BlockCreationError::MaxFeeBelowBaseFee {
                        index,
                        max_fee,
                        base_fee,
                    });
                }
            } else if let Some(gas_price) = transaction.gas_price() {
                if gas_price < base_fee {
                    return Err(BlockCreationError::GasPriceBelowBaseFee {
                        index,
                        gas_price,
                        base_fee,
                    });
                }
            }
        }

        Ok(())
    }

    fn validate_rlp_size(&self, config: &BlockConfig<'_>) -> Result<(), BlockCreationError> {
        if !config.is_eip_active(7934) {
            return Ok(());
        }

        let max = config.param("maxRlpBlockSize").unwrap_or(8_388_608);
        let actual = self.rlp_size();
        if actual > max {
            return Err(BlockCreationError::RlpSizeExceeded { max, actual });
        }

        Ok(())
    }

    /// Validates the blob fee rules that depend on the parent header: every
    /// blob transaction must afford the parent-derived blob gas price, and
    /// the header's excess blob gas must follow from the parent's counters.
    pub fn validate_blob_gas_against_parent(
        &self,
        parent: &Header,
        config: &BlockConfig<'_>,
    ) -> Result<(), BlockCreationError> {
        if !config.is_eip_active(4844) {
            return Ok(());
        }

        let hardfork = config.hardfork();
        let expected_excess = calc_next_excess_blob_gas(parent, hardfork, config);
        let actual_excess = self
            .header
            .blob_gas
            .as_ref()
            .map_or(0, |blob_gas| blob_gas.excess_gas);
        if actual_excess != expected_excess {
            return Err(BlockCreationError::ExcessBlobGasMismatch {
                expected: expected_excess,
                actual: actual_excess,
            });
        }

        let price = blob_gas_price(expected_excess, hardfork, config);
        for (index, transaction) in self.transactions.iter().enumerate() {
            if let Some(max_fee) = transaction.max_fee_per_blob_gas() {
                if max_fee < price {
                    return Err(BlockCreationError::MaxFeePerBlobGasTooLow {
                        index,
                        max_fee,
                        blob_gas_price: price,
                    });
                }
            }
        }

        Ok(())
    }
}

fn validate_withdrawals_slot(
    withdrawals: Option<Vec<Withdrawal>>,
    config: &BlockConfig<'_>,
) -> Result<Option<Vec<Withdrawal>>, BlockCreationError> {
    if config.is_eip_active(4895) {
        Ok(Some(withdrawals.unwrap_or_default()))
    } else if withdrawals.is_some() {
        Err(BlockCreationError::WithdrawalsBeforeEip4895)
    } else {
        Ok(None)
    }
}

fn validate_ommers(ommers: &[Header], config: &BlockConfig<'_>) -> Result<(), BlockCreationError> {
    if ommers.is_empty() {
        return Ok(());
    }

    if config.consensus() != ConsensusType::ProofOfWork {
        return Err(BlockCreationError::UnclesForbidden);
    }
    if ommers.len() > 2 {
        return Err(BlockCreationError::TooManyUncles);
    }

    let hashes: Vec<B256> = ommers.iter().map(Header::hash).collect();
    let mut deduped = hashes.clone();
    deduped.sort();
    deduped.dedup();
    if deduped.len() != hashes.len() {
        return Err(BlockCreationError::DuplicateUncles);
    }

    Ok(())
}

impl Encodable for Block {
    fn encode(&self, out: &mut dyn alloy_rlp::BufMut) {
        let payload_length = self.rlp_payload_length();
        alloy_rlp::Header {
            list: true,
            payload_length,
        }
        .encode(out);

        self.header.header().encode(out);
        self.transactions.encode(out);
        self.ommers.encode(out);
        if let Some(withdrawals) = &self.withdrawals {
            withdrawals.encode(out);
        }
    }

    fn length(&self) -> usize {
        let payload_length = self.rlp_payload_length();
        payload_length + alloy_rlp::length_of_length(payload_length)
    }
}

impl Block {
    fn rlp_payload_length(&self) -> usize {
        self.header.header().length()
            + self.transactions.length()
            + self.ommers.length()
            + self
                .withdrawals
                .as_ref()
                .map_or(0, |withdrawals| withdrawals.length())
    }
}

/// Raw block pieces in wire form: header fields, transaction envelopes,
/// uncle header field lists and withdrawal field lists.
#[derive(Clone, Debug, Default)]
pub struct RawBlockParts {
    /// The header's raw field values.
    pub header: Vec<Bytes>,
    /// Raw transaction envelopes.
    pub transactions: Vec<Bytes>,
    /// Raw field values of each uncle header.
    pub ommers: Vec<Vec<Bytes>>,
    /// The withdrawals, when the slot is present.
    pub withdrawals: Option<Vec<Withdrawal>>,
}

impl Block {
    /// Builds a block from raw wire-form pieces.
    pub fn from_raw_parts(
        parts: RawBlockParts,
        config: &BlockConfig<'_>,
    ) -> Result<Self, BlockCreationError> {
        let header = FrozenHeader::from_raw_parts(&parts.header, config)?;

        let transactions = parts
            .transactions
            .iter()
            .map(|raw| Signed::from_raw_bytes(raw))
            .collect::<Result<Vec<_>, _>>()?;

        let ommers = parts
            .ommers
            .iter()
            .map(|raw| {
                FrozenHeader::from_raw_parts(raw, config)
                    .map(|frozen| frozen.header().clone())
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(header, transactions, ommers, parts.withdrawals, config)
    }
}

#[cfg(test)]
mod tests {
    use ember_forks::{chains::mainnet_config, Hardfork};
    use ember_primitives::{Address, U256};
    use ember_trie::{KECCAK_NULL_RLP, KECCAK_RLP_EMPTY_ARRAY};

    use super::*;
    use crate::{header::BlobGas, transaction::Eip4844};

    fn mainnet_genesis_header_data() -> HeaderData {
        HeaderData {
            parent_hash: Some(B256::ZERO),
            ommers_hash: Some(KECCAK_RLP_EMPTY_ARRAY),
            beneficiary: Some(Address::ZERO),
            state_root: Some(
                "0xd7f8974fb5ac78d9ac099b9ad5018bedc2ce0a72dad1827a1709da30580f0544"
                    .parse()
                    .unwrap(),
            ),
            transactions_root: Some(KECCAK_NULL_RLP),
            receipts_root: Some(KECCAK_NULL_RLP),
            difficulty: Some(U256::from(0x400000000u64)),
            number: Some(0),
            gas_limit: Some(0x1388),
            gas_used: Some(0),
            timestamp: Some(0),
            extra_data: Some(
                hex::decode("11bbe8db4e347b4e8c937c1c8370e4b5ed33adb3db69cbdb7a38e1e50b1b82fa")
                    .unwrap()
                    .into(),
            ),
            mix_hash: Some(B256::ZERO),
            nonce: Some(0x0000000000000042u64.into()),
            ..HeaderData::default()
        }
    }

    #[test]
    fn mainnet_genesis_hash() {
        let chain = mainnet_config();
        let config = BlockConfig::at_block(chain, 0, 0);

        let block = Block::from_block_data(
            BlockData {
                header: mainnet_genesis_header_data(),
                ..BlockData::default()
            },
            &config,
            HeaderBuildOptions::default(),
        )
        .unwrap();

        assert_eq!(
            block.hash(),
            "0xd4e56740f876aef8c010b86a40d5f56745a118d0906a34e69aec8c0db1cb8fa3"
                .parse::<B256>()
                .unwrap()
        );
    }

    #[test]
    fn genesis_rlp_round_trip() {
        let chain = mainnet_config();
        let config = BlockConfig::at_block(chain, 0, 0);

        let block = Block::from_block_data(
            BlockData {
                header: mainnet_genesis_header_data(),
                ..BlockData::default()
            },
            &config,
            HeaderBuildOptions::default(),
        )
        .unwrap();

        let decoded = Block::from_rlp(&block.serialized(), chain).unwrap();
        assert_eq!(decoded, block);
        assert_eq!(decoded.hash(), block.hash());
    }

    #[test]
    fn rejects_more_than_two_uncles() {
        let chain = mainnet_config();
        let config = BlockConfig::new(chain, Hardfork::Berlin);

        let ommers: Vec<Header> = (1u64..=3)
            .map(|number| Header {
                number,
                ..Header::default()
            })
            .collect();

        let error = Block::from_block_data(
            BlockData {
                ommers,
                ..BlockData::default()
            },
            &config,
            HeaderBuildOptions::default(),
        )
        .unwrap_err();

        assert_eq!(error.to_string(), "too many uncle headers");
    }

    #[test]
    fn rejects_duplicate_uncles() {
        let chain = mainnet_config();
        let config = BlockConfig::new(chain, Hardfork::Berlin);

        let ommers = vec![Header::default(), Header::default()];

        let error = Block::from_block_data(
            BlockData {
                ommers,
                ..BlockData::default()
            },
            &config,
            HeaderBuildOptions::default(),
        )
        .unwrap_err();

        assert!(matches!(error, BlockCreationError::DuplicateUncles));
    }

    #[test]
    fn rejects_uncles_after_the_merge() {
        let chain = mainnet_config();
        let config = BlockConfig::new(chain, Hardfork::Merge);

        let error = Block::from_block_data(
            BlockData {
                header: HeaderData {
                    base_fee_per_gas: Some(7),
                    ..HeaderData::default()
                },
                ommers: vec![Header::default()],
                ..BlockData::default()
            },
            &config,
            HeaderBuildOptions::default(),
        )
        .unwrap_err();

        assert!(matches!(error, BlockCreationError::UnclesForbidden));
    }

    #[test]
    fn rejects_withdrawals_before_eip4895() {
        let chain = mainnet_config();
        let config = BlockConfig::new(chain, Hardfork::London);

        let error = Block::from_block_data(
            BlockData {
                withdrawals: Some(Vec::new()),
                ..BlockData::default()
            },
            &config,
            HeaderBuildOptions::default(),
        )
        .unwrap_err();

        assert_eq!(
            error.to_string(),
            "Cannot have a withdrawals field if EIP 4895 is not active"
        );
    }

    #[test]
    fn withdrawals_default_to_empty_after_eip4895() {
        let chain = mainnet_config();
        let config = BlockConfig::new(chain, Hardfork::Shanghai);

        let block = Block::from_block_data(
            BlockData::default(),
            &config,
            HeaderBuildOptions::default(),
        )
        .unwrap();

        assert_eq!(block.withdrawals(), Some(&[] as &[Withdrawal]));
        assert!(block.withdrawals_trie_is_valid());
    }

    fn blob_transaction(nonce: u64, blobs: usize) -> Signed {
        Signed::Eip4844(Eip4844 {
            chain_id: 1,
            nonce,
            max_priority_fee_per_gas: 1_000_000_000,
            max_fee_per_gas: 30_000_000_000,
            gas_limit: 21_000,
            to: Address::repeat_byte(0x44),
            value: U256::ZERO,
            input: Bytes::new(),
            access_list: Vec::new(),
            max_fee_per_blob_gas: 1_000_000,
            blob_versioned_hashes: (0..blobs)
                .map(|index| B256::repeat_byte(index as u8 + 1))
                .collect(),
            odd_y_parity: false,
            r: U256::from(1u64),
            s: U256::from(1u64),
        })
    }

    fn cancun_blob_block_data(blob_gas_used: u64) -> BlockData {
        let transactions = vec![
            blob_transaction(0, 2),
            blob_transaction(1, 3),
            blob_transaction(2, 1),
        ];
        let transactions_root =
            ordered_trie_root(transactions.iter().map(|tx| tx.to_raw_bytes()));

        BlockData {
            header: HeaderData {
                transactions_root: Some(transactions_root),
                blob_gas: Some(BlobGas {
                    gas_used: blob_gas_used,
                    excess_gas: 0,
                }),
                ..HeaderData::default()
            },
            transactions,
            ..BlockData::default()
        }
    }

    #[test]
    fn blob_gas_totals_must_match_header() {
        let chain = mainnet_config();
        let config = BlockConfig::new(chain, Hardfork::Cancun);

        // 2 + 3 + 1 blobs at 131072 gas each.
        let block = Block::from_block_data(
            cancun_blob_block_data(786_432),
            &config,
            HeaderBuildOptions::default(),
        )
        .unwrap();
        assert_eq!(block.transactions().len(), 3);

        let error = Block::from_block_data(
            cancun_blob_block_data(655_360),
            &config,
            HeaderBuildOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(
            error,
            BlockCreationError::BlobGasUsedMismatch {
                computed: 786_432,
                expected: 655_360,
            }
        ));
    }

    #[test]
    fn blob_transactions_rejected_before_cancun() {
        let chain = mainnet_config();
        let config = BlockConfig::new(chain, Hardfork::Shanghai);

        let mut data = cancun_blob_block_data(0);
        data.header.blob_gas = None;

        let error =
            Block::from_block_data(data, &config, HeaderBuildOptions::default()).unwrap_err();
        assert!(matches!(
            error,
            BlockCreationError::BlobTransactionsBeforeEip4844
        ));
    }

    #[test]
    fn base_fee_floor_applies_to_every_transaction() {
        let chain = mainnet_config();
        let config = BlockConfig::new(chain, Hardfork::London);

        let transactions = vec![Signed::Legacy(crate::transaction::Legacy {
            nonce: 0,
            gas_price: 5,
            gas_limit: 21_000,
            kind: ember_primitives::TxKind::Call(Address::repeat_byte(0x11)),
            value: U256::ZERO,
            input: Bytes::new(),
            v: 27,
            r: U256::from(1u64),
            s: U256::from(1u64),
        })];
        let transactions_root =
            ordered_trie_root(transactions.iter().map(|tx| tx.to_raw_bytes()));

        let error = Block::from_block_data(
            BlockData {
                header: HeaderData {
                    transactions_root: Some(transactions_root),
                    base_fee_per_gas: Some(1_000_000_000),
                    ..HeaderData::default()
                },
                transactions,
                ..BlockData::default()
            },
            &config,
            HeaderBuildOptions::default(),
        )
        .unwrap_err();

        assert!(matches!(
            error,
            BlockCreationError::GasPriceBelowBaseFee {
                index: 0,
                gas_price: 5,
                base_fee: 1_000_000_000,
            }
        ));
    }

    #[test]
    fn excess_blob_gas_must_follow_from_parent() {
        let chain = mainnet_config();
        let config = BlockConfig::new(chain, Hardfork::Cancun);

        let block = Block::from_block_data(
            cancun_blob_block_data(786_432),
            &config,
            HeaderBuildOptions::default(),
        )
        .unwrap();

        // A parent already above target forces a non-zero excess.
        let parent = Header {
            blob_gas: Some(BlobGas {
                gas_used: 786_432,
                excess_gas: 0,
            }),
            ..Header::default()
        };

        let error = block
            .validate_blob_gas_against_parent(&parent, &config)
            .unwrap_err();
        assert!(matches!(
            error,
            BlockCreationError::ExcessBlobGasMismatch {
                expected: 393_216,
                actual: 0,
            }
        ));

        // A quiet parent implies zero excess, which the block carries.
        let parent = Header {
            blob_gas: Some(BlobGas::default()),
            ..Header::default()
        };
        block
            .validate_blob_gas_against_parent(&parent, &config)
            .unwrap();
    }
}
