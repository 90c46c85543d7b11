//! Signed transaction types, as they appear in block bodies.

mod eip1559;
mod eip2930;
mod eip4844;
mod eip7702;
mod legacy;

use alloy_rlp::{Decodable, Encodable};
use ember_primitives::{keccak256, Address, Bytes, B256, U256};

pub use self::{
    eip1559::Eip1559,
    eip2930::Eip2930,
    eip4844::Eip4844,
    eip7702::{Authorization, Eip7702},
    legacy::Legacy,
};
pub use ember_primitives::TxKind;

use crate::{access_list::AccessListItem, signature::SignatureError};

/// An error decoding or recovering a transaction.
#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    /// The 2718 envelope carried an unknown type byte.
    #[error("invalid tx type: {0}")]
    UnknownType(u8),
    /// The envelope was empty.
    #[error("empty transaction envelope")]
    Empty,
    /// Malformed RLP.
    #[error(transparent)]
    Rlp(#[from] alloy_rlp::Error),
    /// Sender recovery failed.
    #[error(transparent)]
    Signature(#[from] SignatureError),
}

/// A signed transaction of any supported type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Signed {
    /// A legacy transaction, with or without EIP-155 replay protection.
    Legacy(Legacy),
    /// An EIP-2930 access-list transaction.
    Eip2930(Eip2930),
    /// An EIP-1559 fee-market transaction.
    Eip1559(Eip1559),
    /// An EIP-4844 blob transaction.
    Eip4844(Eip4844),
    /// An EIP-7702 set-code transaction.
    Eip7702(Eip7702),
}

impl Signed {
    /// The transaction's EIP-2718 type.
    pub fn tx_type(&self) -> u8 {
        match self {
            Signed::Legacy(_) => 0,
            Signed::Eip2930(_) => 1,
            Signed::Eip1559(_) => 2,
            Signed::Eip4844(_) => 3,
            Signed::Eip7702(_) => 4,
        }
    }

    /// The raw wire bytes: the RLP list for legacy transactions, the
    /// type-prefixed payload for typed ones.
    pub fn to_raw_bytes(&self) -> Bytes {
        let mut out = Vec::new();
        match self {
            Signed::Legacy(tx) => tx.encode(&mut out),
            Signed::Eip2930(tx) => {
                out.push(1);
                tx.encode(&mut out);
            }
            Signed::Eip1559(tx) => {
                out.push(2);
                tx.encode(&mut out);
            }
            Signed::Eip4844(tx) => {
                out.push(3);
                tx.encode(&mut out);
            }
            Signed::Eip7702(tx) => {
                out.push(4);
                tx.encode(&mut out);
            }
        }

        out.into()
    }

    /// Decodes a transaction from its raw wire bytes.
    pub fn from_raw_bytes(bytes: &[u8]) -> Result<Self, TransactionError> {
        let Some(first) = bytes.first() else {
            return Err(TransactionError::Empty);
        };

        if *first >= 0xc0 {
            let mut buf = bytes;
            return Ok(Signed::Legacy(Legacy::decode(&mut buf)?));
        }

        let mut payload = &bytes[1..];
        match first {
            1 => Ok(Signed::Eip2930(Eip2930::decode(&mut payload)?)),
            2 => Ok(Signed::Eip1559(Eip1559::decode(&mut payload)?)),
            3 => Ok(Signed::Eip4844(Eip4844::decode(&mut payload)?)),
            4 => Ok(Signed::Eip7702(Eip7702::decode(&mut payload)?)),
            unknown => Err(TransactionError::UnknownType(*unknown)),
        }
    }

    /// The transaction hash, `keccak256` of the raw wire bytes.
    pub fn hash(&self) -> B256 {
        keccak256(self.to_raw_bytes())
    }

    /// The transaction's nonce.
    pub fn nonce(&self) -> u64 {
        match self {
            Signed::Legacy(tx) => tx.nonce,
            Signed::Eip2930(tx) => tx.nonce,
            Signed::Eip1559(tx) => tx.nonce,
            Signed::Eip4844(tx) => tx.nonce,
            Signed::Eip7702(tx) => tx.nonce,
        }
    }

    /// The transaction's gas limit.
    pub fn gas_limit(&self) -> u64 {
        match self {
            Signed::Legacy(tx) => tx.gas_limit,
            Signed::Eip2930(tx) => tx.gas_limit,
            Signed::Eip1559(tx) => tx.gas_limit,
            Signed::Eip4844(tx) => tx.gas_limit,
            Signed::Eip7702(tx) => tx.gas_limit,
        }
    }

    /// The fixed gas price, for types that predate the fee market.
    pub fn gas_price(&self) -> Option<u128> {
        match self {
            Signed::Legacy(tx) => Some(tx.gas_price),
            Signed::Eip2930(tx) => Some(tx.gas_price),
            Signed::Eip1559(_) | Signed::Eip4844(_) | Signed::Eip7702(_) => None,
        }
    }

    /// The maximum total fee per gas, for fee-market transactions.
    pub fn max_fee_per_gas(&self) -> Option<u128> {
        match self {
            Signed::Legacy(_) | Signed::Eip2930(_) => None,
            Signed::Eip1559(tx) => Some(tx.max_fee_per_gas),
            Signed::Eip4844(tx) => Some(tx.max_fee_per_gas),
            Signed::Eip7702(tx) => Some(tx.max_fee_per_gas),
        }
    }

    /// Whether the transaction understands the EIP-1559 fee market.
    pub fn supports_fee_market(&self) -> bool {
        self.max_fee_per_gas().is_some()
    }

    /// The maximum blob fee per blob gas, for blob transactions.
    pub fn max_fee_per_blob_gas(&self) -> Option<u128> {
        match self {
            Signed::Eip4844(tx) => Some(tx.max_fee_per_blob_gas),
            _ => None,
        }
    }

    /// The blob versioned hashes carried by a blob transaction.
    pub fn blob_versioned_hashes(&self) -> &[B256] {
        match self {
            Signed::Eip4844(tx) => &tx.blob_versioned_hashes,
            _ => &[],
        }
    }

    /// The recipient, or `None` for contract creation.
    pub fn kind(&self) -> TxKind {
        match self {
            Signed::Legacy(tx) => tx.kind,
            Signed::Eip2930(tx) => tx.kind,
            Signed::Eip1559(tx) => tx.kind,
            Signed::Eip4844(tx) => TxKind::Call(tx.to),
            Signed::Eip7702(tx) => TxKind::Call(tx.to),
        }
    }

    /// The transferred value.
    pub fn value(&self) -> U256 {
        match self {
            Signed::Legacy(tx) => tx.value,
            Signed::Eip2930(tx) => tx.value,
            Signed::Eip1559(tx) => tx.value,
            Signed::Eip4844(tx) => tx.value,
            Signed::Eip7702(tx) => tx.value,
        }
    }

    /// The calldata.
    pub fn input(&self) -> &Bytes {
        match self {
            Signed::Legacy(tx) => &tx.input,
            Signed::Eip2930(tx) => &tx.input,
            Signed::Eip1559(tx) => &tx.input,
            Signed::Eip4844(tx) => &tx.input,
            Signed::Eip7702(tx) => &tx.input,
        }
    }

    /// The declared access list, for types that carry one.
    pub fn access_list(&self) -> Option<&[AccessListItem]> {
        match self {
            Signed::Legacy(_) => None,
            Signed::Eip2930(tx) => Some(&tx.access_list),
            Signed::Eip1559(tx) => Some(&tx.access_list),
            Signed::Eip4844(tx) => Some(&tx.access_list),
            Signed::Eip7702(tx) => Some(&tx.access_list),
        }
    }

    /// The chain ID the signature commits to, if any.
    pub fn chain_id(&self) -> Option<u64> {
        match self {
            Signed::Legacy(tx) => tx.chain_id(),
            Signed::Eip2930(tx) => Some(tx.chain_id),
            Signed::Eip1559(tx) => Some(tx.chain_id),
            Signed::Eip4844(tx) => Some(tx.chain_id),
            Signed::Eip7702(tx) => Some(tx.chain_id),
        }
    }

    /// Recovers the transaction's signer.
    pub fn recover_sender(&self) -> Result<Address, TransactionError> {
        let sender = match self {
            Signed::Legacy(tx) => tx.recover_sender()?,
            Signed::Eip2930(tx) => tx.recover_sender()?,
            Signed::Eip1559(tx) => tx.recover_sender()?,
            Signed::Eip4844(tx) => tx.recover_sender()?,
            Signed::Eip7702(tx) => tx.recover_sender()?,
        };

        Ok(sender)
    }
}

// In a block body a legacy transaction is an RLP list while a typed one is an
// RLP string holding the type-prefixed payload.
impl Encodable for Signed {
    fn encode(&self, out: &mut dyn alloy_rlp::BufMut) {
        match self {
            Signed::Legacy(tx) => tx.encode(out),
            _ => self.to_raw_bytes().encode(out),
        }
    }

    fn length(&self) -> usize {
        match self {
            Signed::Legacy(tx) => tx.length(),
            _ => self.to_raw_bytes().length(),
        }
    }
}

impl Decodable for Signed {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let Some(first) = buf.first() else {
            return Err(alloy_rlp::Error::InputTooShort);
        };

        if *first >= 0xc0 {
            return Ok(Signed::Legacy(Legacy::decode(buf)?));
        }

        let envelope = Bytes::decode(buf)?;
        Signed::from_raw_bytes(&envelope)
            .map_err(|_error| alloy_rlp::Error::Custom("invalid typed transaction envelope"))
    }
}
