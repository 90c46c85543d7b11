use alloy_rlp::{RlpDecodable, RlpEncodable};
use ember_primitives::{keccak256, Address, Bytes, B256, U256};
use k256::SecretKey;

use crate::{
    access_list::AccessListItem,
    signature::{parity_to_v, Ecdsa, SignatureError},
};

/// An EIP-4844 blob transaction, type `0x03`. Blob transactions cannot
/// create contracts, so the recipient is a plain address.
#[derive(Clone, Debug, PartialEq, Eq, RlpDecodable, RlpEncodable)]
pub struct Eip4844 {
    /// The chain ID.
    pub chain_id: u64,
    /// The sender's nonce.
    pub nonce: u64,
    /// The maximum priority fee per gas.
    pub max_priority_fee_per_gas: u128,
    /// The maximum total fee per gas.
    pub max_fee_per_gas: u128,
    /// The gas limit.
    pub gas_limit: u64,
    /// The recipient.
    pub to: Address,
    /// The transferred value.
    pub value: U256,
    /// The calldata.
    pub input: Bytes,
    /// The declared access list.
    pub access_list: Vec<AccessListItem>,
    /// The maximum fee per blob gas.
    pub max_fee_per_blob_gas: u128,
    /// The versioned hashes of the carried blobs.
    pub blob_versioned_hashes: Vec<B256>,
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
    max_priority_fee_per_gas: u128,
    max_fee_per_gas: u128,
    gas_limit: u64,
    to: Address,
    value: U256,
    input: &'tx Bytes,
    access_list: &'tx Vec<AccessListItem>,
    max_fee_per_blob_gas: u128,
    blob_versioned_hashes: &'tx Vec<B256>,
}

impl Eip4844 {
    /// The digest the signature commits to.
    pub fn signing_hash(&self) -> B256 {
        let mut encoded = vec![3];
        alloy_rlp::Encodable::encode(
            &Unsigned {
                chain_id: self.chain_id,
                nonce: self.nonce,
                max_priority_fee_per_gas: self.max_priority_fee_per_gas,
                max_fee_per_gas: self.max_fee_per_gas,
                gas_limit: self.gas_limit,
                to: self.to,
                value: self.value,
                input: &self.input,
                access_list: &self.access_list,
                max_fee_per_blob_gas: self.max_fee_per_blob_gas,
                blob_versioned_hashes: &self.blob_versioned_hashes,
            },
            &mut encoded,
        );

        keccak256(encoded)
    }

    /// Signs the transaction fields with the provided key.
    pub fn new_signed(mut tx: Eip4844, secret_key: &SecretKey) -> Result<Eip4844, SignatureError> {
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

    /// The total blob gas the transaction consumes.
    pub fn total_blob_gas(&self, blob_gas_per_blob: u64) -> u64 {
        blob_gas_per_blob * self.blob_versioned_hashes.len() as u64
    }
}

#[cfg(test)]
mod tests {
    use alloy_rlp::Decodable as _;

    use super::*;
    use crate::signature::secret_key_to_address;

    fn test_key() -> SecretKey {
        SecretKey::from_slice(&[0x46u8; 32]).unwrap()
    }

    fn sample() -> Eip4844 {
        Eip4844 {
            chain_id: 1,
            nonce: 0,
            max_priority_fee_per_gas: 1_000_000_000,
            max_fee_per_gas: 30_000_000_000,
            gas_limit: 21_000,
            to: Address::repeat_byte(0x44),
            value: U256::ZERO,
            input: Bytes::new(),
            access_list: Vec::new(),
            max_fee_per_blob_gas: 1_000_000,
            blob_versioned_hashes: vec![B256::repeat_byte(0x01), B256::repeat_byte(0x02)],
            odd_y_parity: false,
            r: U256::ZERO,
            s: U256::ZERO,
        }
    }

    #[test]
    fn rlp_round_trip() {
        let signed = Eip4844::new_signed(sample(), &test_key()).unwrap();

        let encoded = alloy_rlp::encode(&signed);
        let decoded = Eip4844::decode(&mut encoded.as_slice()).unwrap();
        assert_eq!(signed, decoded);
    }

    #[test]
    fn recovers_sender() {
        let signed = Eip4844::new_signed(sample(), &test_key()).unwrap();

        assert_eq!(
            signed.recover_sender().unwrap(),
            secret_key_to_address(&test_key())
        );
    }

    #[test]
    fn blob_gas_total() {
        assert_eq!(sample().total_blob_gas(131_072), 262_144);
    }
}
