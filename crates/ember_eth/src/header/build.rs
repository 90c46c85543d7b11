use alloy_rlp::Decodable as _;
use ember_forks::{ChainConfig, ConsensusType, ForkCondition, Hardfork};
use ember_primitives::{Address, Bloom, Bytes, B256, B64, SHA256_EMPTY, U256};
use ember_trie::{KECCAK_NULL_RLP, KECCAK_RLP_EMPTY_ARRAY};

use super::{
    validation::{b256_field, uint_field, validate_header},
    BlobGas, FrozenHeader, Header, HeaderValidationError,
};
use crate::difficulty::canonical_difficulty;

/// The chain context a header or block is validated under: the chain's
/// configuration plus the hardfork resolved for the value in question.
#[derive(Clone, Copy, Debug)]
pub struct BlockConfig<'chain> {
    chain: &'chain ChainConfig,
    hardfork: Hardfork,
}

impl<'chain> BlockConfig<'chain> {
    /// Creates a context pinning the provided hardfork.
    pub fn new(chain: &'chain ChainConfig, hardfork: Hardfork) -> Self {
        Self { chain, hardfork }
    }

    /// Creates a context with the hardfork resolved from the block number
    /// and timestamp.
    pub fn at_block(chain: &'chain ChainConfig, block_number: u64, timestamp: u64) -> Self {
        Self {
            chain,
            hardfork: chain.hardfork_at_block(block_number, timestamp),
        }
    }

    /// The chain configuration.
    pub fn chain(&self) -> &'chain ChainConfig {
        self.chain
    }

    /// The hardfork this context is pinned to.
    pub fn hardfork(&self) -> Hardfork {
        self.hardfork
    }

    /// Whether the provided EIP applies in this context.
    pub fn is_eip_active(&self, eip: u64) -> bool {
        self.chain.is_eip_active_at_hardfork(eip, self.hardfork)
    }

    /// The value of the named protocol parameter in this context.
    pub fn param(&self, name: &str) -> Option<u64> {
        self.chain.param_at_hardfork(name, self.hardfork)
    }

    /// The sealing algorithm in effect in this context.
    pub fn consensus(&self) -> ConsensusType {
        self.chain.consensus_at_hardfork(self.hardfork)
    }

    /// Whether the provided block number is the first with EIP-1559 rules.
    pub fn is_london_activation_block(&self, block_number: u64) -> bool {
        matches!(
            self.chain.hardfork_activations.activation_of(Hardfork::London),
            Some(ForkCondition::Block(activation)) if activation == block_number
        )
    }
}

/// Header fields as provided by a caller; anything absent is filled with the
/// protocol default for the configured hardfork.
#[derive(Clone, Debug, Default)]
pub struct HeaderData {
    /// The parent block's hash.
    pub parent_hash: Option<B256>,
    /// The ommers' root hash.
    pub ommers_hash: Option<B256>,
    /// The block's beneficiary address.
    pub beneficiary: Option<Address>,
    /// The state's root hash.
    pub state_root: Option<B256>,
    /// The transactions' root hash.
    pub transactions_root: Option<B256>,
    /// The receipts' root hash.
    pub receipts_root: Option<B256>,
    /// The logs' bloom.
    pub logs_bloom: Option<Bloom>,
    /// The block's difficulty.
    pub difficulty: Option<U256>,
    /// The block's number.
    pub number: Option<u64>,
    /// The block's gas limit.
    pub gas_limit: Option<u64>,
    /// The amount of gas used by the block.
    pub gas_used: Option<u64>,
    /// The block's timestamp.
    pub timestamp: Option<u64>,
    /// The block's extra data.
    pub extra_data: Option<Bytes>,
    /// The block's mix hash.
    pub mix_hash: Option<B256>,
    /// The block's nonce.
    pub nonce: Option<B64>,
    /// The block's base fee, EIP-1559 onwards.
    pub base_fee_per_gas: Option<u128>,
    /// The withdrawals root, EIP-4895 onwards.
    pub withdrawals_root: Option<B256>,
    /// The blob gas counters, EIP-4844 onwards.
    pub blob_gas: Option<BlobGas>,
    /// The parent beacon block root, EIP-4788 onwards.
    pub parent_beacon_block_root: Option<B256>,
    /// The requests commitment, EIP-7685 onwards.
    pub requests_hash: Option<B256>,
}

/// Fallback base fee when a post-London header is built without one and is
/// not the activation block itself.
const DEFAULT_BASE_FEE: u128 = 2;

impl HeaderData {
    /// Resolves the data into a full header, filling protocol defaults for
    /// the configured hardfork.
    pub fn into_header(self, config: &BlockConfig<'_>) -> Header {
        let number = self.number.unwrap_or_default();

        Header {
            parent_hash: self.parent_hash.unwrap_or_default(),
            ommers_hash: self.ommers_hash.unwrap_or(KECCAK_RLP_EMPTY_ARRAY),
            beneficiary: self.beneficiary.unwrap_or_default(),
            state_root: self.state_root.unwrap_or(KECCAK_NULL_RLP),
            transactions_root: self.transactions_root.unwrap_or(KECCAK_NULL_RLP),
            receipts_root: self.receipts_root.unwrap_or(KECCAK_NULL_RLP),
            logs_bloom: self.logs_bloom.unwrap_or_default(),
            difficulty: self.difficulty.unwrap_or_default(),
            number,
            gas_limit: self.gas_limit.unwrap_or(1_000_000),
            gas_used: self.gas_used.unwrap_or_default(),
            timestamp: self.timestamp.unwrap_or_default(),
            extra_data: self.extra_data.unwrap_or_default(),
            mix_hash: self.mix_hash.unwrap_or_default(),
            nonce: self.nonce.unwrap_or_default(),
            base_fee_per_gas: self.base_fee_per_gas.or_else(|| {
                config.is_eip_active(1559).then(|| {
                    if config.is_london_activation_block(number) {
                        config
                            .param("initialBaseFee")
                            .map_or(DEFAULT_BASE_FEE, u128::from)
                    } else {
                        DEFAULT_BASE_FEE
                    }
                })
            }),
            withdrawals_root: self
                .withdrawals_root
                .or_else(|| config.is_eip_active(4895).then_some(KECCAK_NULL_RLP)),
            blob_gas: self
                .blob_gas
                .or_else(|| config.is_eip_active(4844).then(BlobGas::default)),
            parent_beacon_block_root: self
                .parent_beacon_block_root
                .or_else(|| config.is_eip_active(4788).then_some(B256::ZERO)),
            requests_hash: self
                .requests_hash
                .or_else(|| config.is_eip_active(7685).then_some(SHA256_EMPTY)),
        }
    }
}

impl From<Header> for HeaderData {
    fn from(header: Header) -> Self {
        Self {
            parent_hash: Some(header.parent_hash),
            ommers_hash: Some(header.ommers_hash),
            beneficiary: Some(header.beneficiary),
            state_root: Some(header.state_root),
            transactions_root: Some(header.transactions_root),
            receipts_root: Some(header.receipts_root),
            logs_bloom: Some(header.logs_bloom),
            difficulty: Some(header.difficulty),
            number: Some(header.number),
            gas_limit: Some(header.gas_limit),
            gas_used: Some(header.gas_used),
            timestamp: Some(header.timestamp),
            extra_data: Some(header.extra_data),
            mix_hash: Some(header.mix_hash),
            nonce: Some(header.nonce),
            base_fee_per_gas: header.base_fee_per_gas,
            withdrawals_root: header.withdrawals_root,
            blob_gas: header.blob_gas,
            parent_beacon_block_root: header.parent_beacon_block_root,
            requests_hash: header.requests_hash,
        }
    }
}

/// Options modifying header construction.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeaderBuildOptions<'parent> {
    /// The parent header, enabling difficulty derivation.
    pub parent: Option<&'parent Header>,
    /// Recompute the canonical proof-of-work difficulty from the parent
    /// instead of trusting the provided value.
    pub calc_difficulty_from_parent: bool,
    /// Skip consensus-format validation. Field lengths and EIP gating are
    /// still enforced by the typed representation.
    pub skip_consensus_checks: bool,
}

impl FrozenHeader {
    /// Builds a validated, frozen header from the provided data.
    pub fn new(
        data: HeaderData,
        config: &BlockConfig<'_>,
        options: HeaderBuildOptions<'_>,
    ) -> Result<Self, HeaderValidationError> {
        let mut header = data.into_header(config);

        if options.calc_difficulty_from_parent
            && config.consensus() == ConsensusType::ProofOfWork
        {
            if let Some(parent) = options.parent {
                header.difficulty =
                    canonical_difficulty(header.number, header.timestamp, parent, config);
            }
        }

        if !options.skip_consensus_checks {
            validate_header(&header, config)?;
        }

        Ok(Self::freeze(header))
    }

    /// Builds a frozen header from raw field values in canonical order.
    pub fn from_raw_parts(
        values: &[Bytes],
        config: &BlockConfig<'_>,
    ) -> Result<Self, HeaderValidationError> {
        if !(15..=21).contains(&values.len()) {
            return Err(HeaderValidationError::InvalidRawLength(values.len()));
        }

        let address_field = |field: &'static str, bytes: &Bytes| {
            if bytes.len() != 20 {
                return Err(HeaderValidationError::InvalidFieldLength {
                    field,
                    expected: 20,
                    actual: bytes.len(),
                });
            }
            Ok(Address::from_slice(bytes))
        };

        let bloom = &values[6];
        if bloom.len() != 256 {
            return Err(HeaderValidationError::InvalidFieldLength {
                field: "logsBloom",
                expected: 256,
                actual: bloom.len(),
            });
        }
        let nonce = &values[14];
        if nonce.len() != 8 {
            return Err(HeaderValidationError::InvalidFieldLength {
                field: "nonce",
                expected: 8,
                actual: nonce.len(),
            });
        }
        let difficulty = &values[7];
        if difficulty.len() > 32 {
            return Err(HeaderValidationError::IntegerOverflow {
                field: "difficulty",
                width: 32,
            });
        }

        let mut data = HeaderData {
            parent_hash: Some(b256_field("parentHash", &values[0])?),
            ommers_hash: Some(b256_field("uncleHash", &values[1])?),
            beneficiary: Some(address_field("coinbase", &values[2])?),
            state_root: Some(b256_field("stateRoot", &values[3])?),
            transactions_root: Some(b256_field("transactionsTrie", &values[4])?),
            receipts_root: Some(b256_field("receiptTrie", &values[5])?),
            logs_bloom: Some(Bloom::from_slice(bloom)),
            difficulty: Some(U256::from_be_slice(difficulty)),
            number: Some(uint_field("number", 8, &values[8])?),
            gas_limit: Some(uint_field("gasLimit", 8, &values[9])?),
            gas_used: Some(uint_field("gasUsed", 8, &values[10])?),
            timestamp: Some(uint_field("timestamp", 8, &values[11])?),
            extra_data: Some(values[12].clone()),
            mix_hash: Some(b256_field("mixHash", &values[13])?),
            nonce: Some(B64::from_slice(nonce)),
            ..HeaderData::default()
        };

        let mut trailing = values[15..].iter();
        if config.is_eip_active(1559) {
            if let Some(base_fee) = trailing.next() {
                data.base_fee_per_gas =
                    Some(u128::from(uint_field("baseFeePerGas", 16, base_fee)?));
            }
        }
        if config.is_eip_active(4895) {
            if let Some(withdrawals_root) = trailing.next() {
                data.withdrawals_root = Some(b256_field("withdrawalsRoot", withdrawals_root)?);
            }
        }
        if config.is_eip_active(4844) {
            if let (Some(gas_used), Some(excess_gas)) = (trailing.next(), trailing.next()) {
                data.blob_gas = Some(BlobGas {
                    gas_used: uint_field("blobGasUsed", 8, gas_used)?,
                    excess_gas: uint_field("excessBlobGas", 8, excess_gas)?,
                });
            }
        }
        if config.is_eip_active(4788) {
            if let Some(root) = trailing.next() {
                data.parent_beacon_block_root = Some(b256_field("parentBeaconBlockRoot", root)?);
            }
        }
        if config.is_eip_active(7685) {
            if let Some(requests_hash) = trailing.next() {
                data.requests_hash = Some(b256_field("requestsHash", requests_hash)?);
            }
        }

        Self::new(data, config, HeaderBuildOptions::default())
    }

    /// Decodes and validates an RLP-encoded header.
    pub fn from_rlp(
        mut bytes: &[u8],
        config: &BlockConfig<'_>,
    ) -> Result<Self, HeaderValidationError> {
        let header = Header::decode(&mut bytes)?;

        Self::from_header(header, config)
    }

    /// Validates and freezes an already-decoded header.
    pub fn from_header(
        header: Header,
        config: &BlockConfig<'_>,
    ) -> Result<Self, HeaderValidationError> {
        validate_header(&header, config)?;

        Ok(Self::freeze(header))
    }
}
