use alloy_rlp::{RlpDecodable, RlpEncodable};
use ember_primitives::{keccak256, Address, Bytes, B256, U256};
use k256::SecretKey;

use super::TxKind;
use crate::{
    access_list::AccessListItem,
    signature::{parity_to_v, Ecdsa, SignatureError},
};

/// An EIP-2930 access-list transaction, type `0x01`.
#[derive(Clone, Debug, PartialEq, Eq, RlpDecodable, RlpEncodable)]
pub struct Eip2930 {
    /// The chain ID.
    pub chain_id: u64,
    /// The sender's nonce.
    pub nonce: u64,
    /// The fixed gas price.
    pub gas_price: u128,
    /// The gas limit.
    pub gas_limit: u64,
    /// The recipient, or creation.
    pub kind: TxKind,
    /// The transferred value.
    pub value: U256,
    /// The calldata.
    pub input: Bytes,
    /// The declared access list.
    pub access_list: Vec<AccessListItem>,
    /// Signature Y-parity.
    pub odd_y_parity: bool,
    /// Signature R value.
    pub r: U256,
    /// Signature S value.
    pub s: U256,
}

#[derive(RlpEncodable)]
struct Unsigned<'tx> {
    chain_id: u64,
    nonce: u64,
    gas_price: u128,
    gas_limit: u64,
    kind: TxKind,
    value: U256,
    input: &'tx Bytes,
    access_list: &'tx Vec<AccessListItem>,
}

impl Eip2930 {
    /// The digest the signature commits to.
    pub fn signing_hash(&self) -> B256 {
        let mut encoded = vec![1];
        alloy_rlp::Encodable::encode(
            &Unsigned {
                chain_id: self.chain_id,
                nonce: self.nonce,
                gas_price: self.gas_price,
                gas_limit: self.gas_limit,
                kind: self.kind,
                value: self.value,
                input: &self.input,
                access_list: &self.access_list,
            },
            &mut encoded,
        );

        keccak256(encoded)
    }

    /// Signs the transaction fields with the provided key.
    pub fn new_signed(mut tx: Eip2930, secret_key: &SecretKey) -> Result<Eip2930, SignatureError> {
        let signature = Ecdsa::new(tx.signing_hash(), secret_key)?;

        tx.r = signature.r;
        tx.s = signature.s;
        tx.odd_y_parity = signature.odd_y_parity();

        Ok(tx)
    }

    /// Recovers the transaction's signer.
    pub fn recover_sender(&self) -> Result<Address, SignatureError> {
        Ecdsa {
            r: self.r,
            s: self.s,
            v: parity_to_v(self.odd_y_parity),
        }
        .recover_address(self.signing_hash())
    }
}
