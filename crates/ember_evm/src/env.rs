use ember_primitives::{Address, B256, U256};

/// Block-level context an executing frame can observe.
#[derive(Clone, Debug, Default)]
pub struct BlockEnv {
    /// The block number.
    pub number: u64,
    /// The block's beneficiary.
    pub coinbase: Address,
    /// The block's timestamp.
    pub timestamp: u64,
    /// The block's gas limit.
    pub gas_limit: u64,
    /// The block's difficulty; zero post-merge.
    pub difficulty: U256,
    /// The randomness beacon value, post-merge.
    pub prevrandao: B256,
    /// The block's base fee.
    pub base_fee: u128,
    /// The blob gas price derived from the parent's excess blob gas.
    pub blob_gas_price: u128,
}

/// Transaction-level context shared by every frame of a transaction.
#[derive(Clone, Debug, Default)]
pub struct TxEnv {
    /// The transaction sender.
    pub origin: Address,
    /// The effective gas price paid.
    pub gas_price: u128,
    /// The versioned hashes of the transaction's blobs.
    pub blob_hashes: Vec<B256>,
}

/// Static configuration of the executing environment.
#[derive(Clone, Debug)]
pub struct CfgEnv {
    /// The chain ID reported by `CHAINID`.
    pub chain_id: u64,
    /// Lifts the EIP-3860 init-code size cap.
    pub allow_unlimited_init_code: bool,
    /// Lifts the EIP-170 deployed-code size cap.
    pub allow_unlimited_contract_size: bool,
}

impl Default for CfgEnv {
    fn default() -> Self {
        Self {
            chain_id: 1,
            allow_unlimited_init_code: false,
            allow_unlimited_contract_size: false,
        }
    }
}
