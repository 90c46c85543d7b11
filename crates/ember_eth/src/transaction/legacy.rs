use alloy_rlp::{RlpDecodable, RlpEncodable};
use ember_primitives::{keccak256, Address, Bytes, B256, U256};
use k256::SecretKey;

use super::TxKind;
use crate::signature::{Ecdsa, SignatureError};

/// A legacy transaction. Replay protection per EIP-155 is encoded in the
/// signature's `v` value.
#[derive(Clone, Debug, PartialEq, Eq, RlpDecodable, RlpEncodable)]
pub struct Legacy {
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
    /// Signature V value, carrying the chain ID when replay-protected.
    pub v: u64,
    /// Signature R value.
    pub r: U256,
    /// Signature S value.
    pub s: U256,
}

#[derive(RlpEncodable)]
struct Unsigned<'tx> {
    nonce: u64,
    gas_price: u128,
    gas_limit: u64,
    kind: TxKind,
    value: U256,
    input: &'tx Bytes,
}

#[derive(RlpEncodable)]
struct UnsignedEip155<'tx> {
    nonce: u64,
    gas_price: u128,
    gas_limit: u64,
    kind: TxKind,
    value: U256,
    input: &'tx Bytes,
    chain_id: u64,
    zero_r: u8,
    zero_s: u8,
}

impl Legacy {
    /// The chain ID committed to by an EIP-155 signature, `None` for
    /// pre-EIP-155 transactions.
    pub fn chain_id(&self) -> Option<u64> {
        if self.v >= 35 {
            Some((self.v - 35) / 2)
        } else {
            None
        }
    }

    /// The digest the signature commits to.
    pub fn signing_hash(&self, chain_id: Option<u64>) -> B256 {
        let encoded = match chain_id {
            Some(chain_id) => alloy_rlp::encode(UnsignedEip155 {
                nonce: self.nonce,
                gas_price: self.gas_price,
                gas_limit: self.gas_limit,
                kind: self.kind,
                value: self.value,
                input: &self.input,
                chain_id,
                zero_r: 0,
                zero_s: 0,
            }),
            None => alloy_rlp::encode(Unsigned {
                nonce: self.nonce,
                gas_price: self.gas_price,
                gas_limit: self.gas_limit,
                kind: self.kind,
                value: self.value,
                input: &self.input,
            }),
        };

        keccak256(encoded)
    }

    /// Signs the transaction fields with the provided key, committing to the
    /// given chain ID when present.
    pub fn new_signed(
        mut tx: Legacy,
        chain_id: Option<u64>,
        secret_key: &SecretKey,
    ) -> Result<Legacy, SignatureError> {
        let signature = Ecdsa::new(tx.signing_hash(chain_id), secret_key)?;

        tx.r = signature.r;
        tx.s = signature.s;
        tx.v = match chain_id {
            Some(chain_id) => signature.v - 27 + 35 + 2 * chain_id,
            None => signature.v,
        };

        Ok(tx)
    }

    /// Recovers the transaction's signer.
    pub fn recover_sender(&self) -> Result<Address, SignatureError> {
        let chain_id = self.chain_id();
        let recovery_v = match chain_id {
            Some(chain_id) => self.v - 35 - 2 * chain_id + 27,
            None => self.v,
        };

        Ecdsa {
            r: self.r,
            s: self.s,
            v: recovery_v,
        }
        .recover_address(self.signing_hash(chain_id))
    }
}

#[cfg(test)]
mod tests {
    use alloy_rlp::Decodable as _;

    use super::*;
    use crate::signature::secret_key_to_address;

    fn test_key() -> SecretKey {
        SecretKey::from_slice(
            &hex::decode("4646464646464646464646464646464646464646464646464646464646464646")
                .unwrap(),
        )
        .unwrap()
    }

    fn unsigned() -> Legacy {
        Legacy {
            nonce: 9,
            gas_price: 20_000_000_000,
            gas_limit: 21_000,
            kind: TxKind::Call(
                "0x3535353535353535353535353535353535353535"
                    .parse()
                    .unwrap(),
            ),
            value: U256::from(10u64).pow(U256::from(18u64)),
            input: Bytes::new(),
            v: 0,
            r: U256::ZERO,
            s: U256::ZERO,
        }
    }

    #[test]
    // Test vector from: https://eips.ethereum.org/EIPS/eip-155
    fn eip155_signing_hash() {
        let expected =
            "0xdaf5a779ae972f972197303d7b574746c7ef83eadac0f2791ad23db92e4c8e53";

        assert_eq!(
            unsigned().signing_hash(Some(1)),
            expected.parse::<B256>().unwrap()
        );
    }

    #[test]
    // Test vector from: https://eips.ethereum.org/EIPS/eip-155
    fn eip155_signature_values() {
        let signed = Legacy::new_signed(unsigned(), Some(1), &test_key()).unwrap();

        assert_eq!(signed.v, 37);
        assert_eq!(
            signed.r,
            U256::from_str_radix(
                "18515461264373351373200002665853028612451056578545711640558177340181847433846",
                10
            )
            .unwrap()
        );
        assert_eq!(
            signed.s,
            U256::from_str_radix(
                "46948507304638947509940763649030358759909902576025900602547168820602576006531",
                10
            )
            .unwrap()
        );
    }

    #[test]
    fn recovers_eip155_sender() {
        let signed = Legacy::new_signed(unsigned(), Some(1), &test_key()).unwrap();

        assert_eq!(signed.chain_id(), Some(1));
        assert_eq!(
            signed.recover_sender().unwrap(),
            secret_key_to_address(&test_key())
        );
    }

    #[test]
    fn recovers_pre_eip155_sender() {
        let signed = Legacy::new_signed(unsigned(), None, &test_key()).unwrap();

        assert_eq!(signed.chain_id(), None);
        assert_eq!(
            signed.recover_sender().unwrap(),
            secret_key_to_address(&test_key())
        );
    }

    #[test]
    fn rlp_round_trip() {
        let signed = Legacy::new_signed(unsigned(), Some(1), &test_key()).unwrap();

        let encoded = alloy_rlp::encode(&signed);
        let decoded = Legacy::decode(&mut encoded.as_slice()).unwrap();
        assert_eq!(signed, decoded);
    }
}
