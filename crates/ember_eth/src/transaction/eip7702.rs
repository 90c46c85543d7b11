use alloy_rlp::{RlpDecodable, RlpEncodable};
use ember_primitives::{keccak256, Address, Bytes, B256, U256};
use k256::SecretKey;

use crate::{
    access_list::AccessListItem,
    signature::{parity_to_v, Ecdsa, SignatureError},
};

/// A signed EIP-7702 authorization: permission to install the delegation
/// designator of `address` into the signer's account.
#[derive(Clone, Debug, PartialEq, Eq, RlpDecodable, RlpEncodable)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Authorization {
    /// The chain the authorization is valid on; zero for any chain.
    pub chain_id: U256,
    /// The delegated-to address.
    pub address: Address,
    /// The authorizing account's nonce.
    #[serde(with = "alloy_serde::quantity")]
    pub nonce: u64,
    /// Signature Y-parity.
    #[serde(rename = "yParity", with = "alloy_serde::quantity")]
    pub odd_y_parity: bool,
    /// Signature R value.
    pub r: U256,
    /// Signature S value.
    pub s: U256,
}

/// An EIP-7702 set-code transaction, type `0x04`. Like blob transactions it
/// cannot create contracts.
#[derive(Clone, Debug, PartialEq, Eq, RlpDecodable, RlpEncodable)]
pub struct Eip7702 {
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
    /// The carried authorizations.
    pub authorization_list: Vec<Authorization>,
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
    authorization_list: &'tx Vec<Authorization>,
}

impl Eip7702 {
    /// The digest the signature commits to.
    pub fn signing_hash(&self) -> B256 {
        let mut encoded = vec![4];
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
                authorization_list: &self.authorization_list,
            },
            &mut encoded,
        );

        keccak256(encoded)
    }

    /// Signs the transaction fields with the provided key.
    pub fn new_signed(mut tx: Eip7702, secret_key: &SecretKey) -> Result<Eip7702, SignatureError> {
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

#[cfg(test)]
mod tests {
    use alloy_rlp::Decodable as _;

    use super::*;
    use crate::signature::secret_key_to_address;

    fn test_key() -> SecretKey {
        SecretKey::from_slice(&[0x46u8; 32]).unwrap()
    }

    fn sample() -> Eip7702 {
        Eip7702 {
            chain_id: 1,
            nonce: 11,
            max_priority_fee_per_gas: 1_000_000_000,
            max_fee_per_gas: 25_000_000_000,
            gas_limit: 60_000,
            to: Address::repeat_byte(0x55),
            value: U256::ZERO,
            input: Bytes::new(),
            access_list: Vec::new(),
            authorization_list: vec![Authorization {
                chain_id: U256::from(1u64),
                address: Address::repeat_byte(0x66),
                nonce: 0,
                odd_y_parity: false,
                r: U256::from(1u64),
                s: U256::from(1u64),
            }],
            odd_y_parity: false,
            r: U256::ZERO,
            s: U256::ZERO,
        }
    }

    #[test]
    fn rlp_round_trip() {
        let signed = Eip7702::new_signed(sample(), &test_key()).unwrap();

        let encoded = alloy_rlp::encode(&signed);
        let decoded = Eip7702::decode(&mut encoded.as_slice()).unwrap();
        assert_eq!(signed, decoded);
    }

    #[test]
    fn recovers_sender() {
        let signed = Eip7702::new_signed(sample(), &test_key()).unwrap();

        assert_eq!(
            signed.recover_sender().unwrap(),
            secret_key_to_address(&test_key())
        );
    }
}
