use alloy_rlp::{RlpDecodable, RlpEncodable};
use ember_primitives::{keccak256, Address, Bytes, B256, U256};
use k256::SecretKey;

use super::TxKind;
use crate::{
    access_list::AccessListItem,
    signature::{parity_to_v, Ecdsa, SignatureError},
};

/// An EIP-1559 fee-market transaction, type `0x02`.
#[derive(Clone, Debug, PartialEq, Eq, RlpDecodable, RlpEncodable)]
pub struct Eip1559 {
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
    max_priority_fee_per_gas: u128,
    max_fee_per_gas: u128,
    gas_limit: u64,
    kind: TxKind,
    value: U256,
    input: &'tx Bytes,
    access_list: &'tx Vec<AccessListItem>,
}

impl Eip1559 {
    /// The digest the signature commits to.
    pub fn signing_hash(&self) -> B256 {
        let mut encoded = vec![2];
        alloy_rlp::Encodable::encode(
            &Unsigned {
                chain_id: self.chain_id,
                nonce: self.nonce,
                max_priority_fee_per_gas: self.max_priority_fee_per_gas,
                max_fee_per_gas: self.max_fee_per_gas,
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
    pub fn new_signed(mut tx: Eip1559, secret_key: &SecretKey) -> Result<Eip1559, SignatureError> {
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

    /// The effective gas price under the provided base fee.
    pub fn effective_gas_price(&self, base_fee: u128) -> u128 {
        self.max_priority_fee_per_gas
            .min(self.max_fee_per_gas.saturating_sub(base_fee))
            + base_fee
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

    fn sample() -> Eip1559 {
        Eip1559 {
            chain_id: 1,
            nonce: 1,
            max_priority_fee_per_gas: 2_000_000_000,
            max_fee_per_gas: 30_000_000_000,
            gas_limit: 21_000,
            kind: TxKind::Call(Address::repeat_byte(0x33)),
            value: U256::from(500u64),
            input: Bytes::new(),
            access_list: Vec::new(),
            odd_y_parity: false,
            r: U256::ZERO,
            s: U256::ZERO,
        }
    }

    #[test]
    fn rlp_round_trip() {
        let signed = Eip1559::new_signed(sample(), &test_key()).unwrap();

        let encoded = alloy_rlp::encode(&signed);
        let decoded = Eip1559::decode(&mut encoded.as_slice()).unwrap();
        assert_eq!(signed, decoded);
    }

    #[test]
    fn recovers_sender() {
        let signed = Eip1559::new_signed(sample(), &test_key()).unwrap();

        assert_eq!(
            signed.recover_sender().unwrap(),
            secret_key_to_address(&test_key())
        );
    }

    #[test]
    fn effective_gas_price_is_capped() {
        let tx = sample();

        // Base fee low: priority fee rides on top.
        assert_eq!(tx.effective_gas_price(10_000_000_000), 12_000_000_000);
        // Base fee close to the cap: the tip is squeezed.
        assert_eq!(tx.effective_gas_price(29_000_000_000), 30_000_000_000);
    }
}
