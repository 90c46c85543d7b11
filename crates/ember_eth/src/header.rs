mod build;
mod validation;

use alloy_rlp::{BufMut, Decodable, RlpDecodable, RlpEncodable};
use ember_primitives::{keccak256, Address, Bloom, Bytes, B256, B64, U256};
use once_cell::sync::OnceCell;

pub use self::{
    build::{BlockConfig, HeaderBuildOptions, HeaderData},
    validation::{validate_gas_limit, HeaderValidationError},
};

/// Ethereum block header.
///
/// The trailing optional fields were introduced by EIP-1559, EIP-4895,
/// EIP-4844, EIP-4788 and EIP-7685, in that canonical order; they are
/// omitted from the RLP form when absent.
#[derive(Clone, Debug, Default, PartialEq, Eq, RlpDecodable, RlpEncodable)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
#[rlp(trailing)]
pub struct Header {
    /// The parent block's hash
    pub parent_hash: B256,
    /// The ommers' root hash
    pub ommers_hash: B256,
    /// The block's beneficiary address
    pub beneficiary: Address,
    /// The state's root hash
    pub state_root: B256,
    /// The transactions' root hash
    pub transactions_root: B256,
    /// The receipts' root hash
    pub receipts_root: B256,
    /// The logs' bloom
    pub logs_bloom: Bloom,
    /// The block's difficulty
    pub difficulty: U256,
    /// The block's number
    #[serde(with = "alloy_serde::quantity")]
    pub number: u64,
    /// The block's gas limit
    #[serde(with = "alloy_serde::quantity")]
    pub gas_limit: u64,
    /// The amount of gas used by the block
    #[serde(with = "alloy_serde::quantity")]
    pub gas_used: u64,
    /// The block's timestamp
    #[serde(with = "alloy_serde::quantity")]
    pub timestamp: u64,
    /// The block's extra data
    pub extra_data: Bytes,
    /// The block's mix hash, carrying the randomness beacon post-merge
    pub mix_hash: B256,
    /// The block's nonce
    pub nonce: B64,
    /// `BaseFee` was added by EIP-1559 and is ignored in legacy headers.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "alloy_serde::quantity::opt"
    )]
    pub base_fee_per_gas: Option<u128>,
    /// `WithdrawalsHash` was added by EIP-4895 and is ignored in legacy
    /// headers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub withdrawals_root: Option<B256>,
    /// Blob gas was added by EIP-4844 and is ignored in older headers.
    #[serde(flatten)]
    pub blob_gas: Option<BlobGas>,
    /// The hash tree root of the parent beacon block for the given execution
    /// block (EIP-4788).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_beacon_block_root: Option<B256>,
    /// The commitment hash calculated for a list of [EIP-7685] data requests.
    ///
    /// [EIP-7685]: https://eips.ethereum.org/EIPS/eip-7685
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requests_hash: Option<B256>,
}

/// Information about the blob gas used in a block.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobGas {
    /// The total amount of blob gas consumed by the transactions within the
    /// block.
    #[serde(rename = "blobGasUsed", with = "alloy_serde::quantity")]
    pub gas_used: u64,
    /// The running total of blob gas consumed in excess of the target, prior
    /// to the block. Blocks with above-target blob gas consumption increase
    /// this value, blocks with below-target blob gas consumption decrease it
    /// (bounded at 0).
    #[serde(rename = "excessBlobGas", with = "alloy_serde::quantity")]
    pub excess_gas: u64,
}

// We need a custom implementation to avoid the struct being treated as an RLP
// list.
impl Decodable for BlobGas {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let blob_gas = Self {
            gas_used: u64::decode(buf)?,
            excess_gas: u64::decode(buf)?,
        };

        Ok(blob_gas)
    }
}

// We need a custom implementation to avoid the struct being treated as an RLP
// list.
impl alloy_rlp::Encodable for BlobGas {
    fn encode(&self, out: &mut dyn BufMut) {
        self.gas_used.encode(out);
        self.excess_gas.encode(out);
    }

    fn length(&self) -> usize {
        self.gas_used.length() + self.excess_gas.length()
    }
}

/// Strips leading zero bytes, the canonical raw form of header integers.
fn trimmed_be_bytes(value: u64) -> Bytes {
    let bytes = value.to_be_bytes();
    let start = bytes.iter().position(|byte| *byte != 0).unwrap_or(8);

    Bytes::copy_from_slice(&bytes[start..])
}

impl Header {
    /// Calculates the block's hash.
    pub fn hash(&self) -> B256 {
        let encoded = alloy_rlp::encode(self);
        keccak256(encoded)
    }

    /// Returns the header's fields in canonical order, integers trimmed of
    /// leading zeros and byte fields verbatim.
    pub fn to_raw(&self) -> Vec<Bytes> {
        let mut values = vec![
            Bytes::copy_from_slice(self.parent_hash.as_slice()),
            Bytes::copy_from_slice(self.ommers_hash.as_slice()),
            Bytes::copy_from_slice(self.beneficiary.as_slice()),
            Bytes::copy_from_slice(self.state_root.as_slice()),
            Bytes::copy_from_slice(self.transactions_root.as_slice()),
            Bytes::copy_from_slice(self.receipts_root.as_slice()),
            Bytes::copy_from_slice(self.logs_bloom.as_slice()),
            self.difficulty.to_be_bytes_trimmed_vec().into(),
            trimmed_be_bytes(self.number),
            trimmed_be_bytes(self.gas_limit),
            trimmed_be_bytes(self.gas_used),
            trimmed_be_bytes(self.timestamp),
            self.extra_data.clone(),
            Bytes::copy_from_slice(self.mix_hash.as_slice()),
            Bytes::copy_from_slice(self.nonce.as_slice()),
        ];

        if let Some(base_fee) = self.base_fee_per_gas {
            values.push(U256::from(base_fee).to_be_bytes_trimmed_vec().into());
        }
        if let Some(withdrawals_root) = &self.withdrawals_root {
            values.push(Bytes::copy_from_slice(withdrawals_root.as_slice()));
        }
        if let Some(blob_gas) = &self.blob_gas {
            values.push(trimmed_be_bytes(blob_gas.gas_used));
            values.push(trimmed_be_bytes(blob_gas.excess_gas));
        }
        if let Some(parent_beacon_block_root) = &self.parent_beacon_block_root {
            values.push(Bytes::copy_from_slice(parent_beacon_block_root.as_slice()));
        }
        if let Some(requests_hash) = &self.requests_hash {
            values.push(Bytes::copy_from_slice(requests_hash.as_slice()));
        }

        values
    }
}

/// An immutable, validated header with a memoized hash.
///
/// Values are only ever produced by the validating constructors; once built,
/// no field mutates.
#[derive(Clone, Debug, Default)]
pub struct FrozenHeader {
    header: Header,
    hash: OnceCell<B256>,
}

impl FrozenHeader {
    pub(crate) fn freeze(header: Header) -> Self {
        Self {
            header,
            hash: OnceCell::new(),
        }
    }

    /// The header's hash, computed on first use.
    pub fn hash(&self) -> B256 {
        *self.hash.get_or_init(|| self.header.hash())
    }

    /// Read access to the underlying header.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// The RLP encoding of the header.
    pub fn serialized(&self) -> Vec<u8> {
        alloy_rlp::encode(&self.header)
    }
}

impl core::ops::Deref for FrozenHeader {
    type Target = Header;

    fn deref(&self) -> &Header {
        &self.header
    }
}

impl PartialEq for FrozenHeader {
    fn eq(&self, other: &Self) -> bool {
        self.header == other.header
    }
}

impl Eq for FrozenHeader {}
