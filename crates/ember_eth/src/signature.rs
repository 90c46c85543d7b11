//! secp256k1 signatures over 32-byte digests.

use ember_primitives::{keccak256, Address, B256, U256};
use k256::{
    ecdsa::{
        signature::hazmat::PrehashSigner, RecoveryId, Signature as EcdsaSignature, SigningKey,
        VerifyingKey,
    },
    elliptic_curve::sec1::ToEncodedPoint,
    FieldBytes, PublicKey, SecretKey,
};

/// An error involving a signature.
#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    /// Invalid length, ECDSA secp256k1 signatures with recovery are 65 bytes
    #[error("invalid signature length, got {0}, expected 65")]
    InvalidLength(usize),
    /// The recovery identifier was out of range.
    #[error("invalid signature recovery id: {0}")]
    InvalidRecoveryId(u64),
    /// ECDSA error
    #[error(transparent)]
    ECDSAError(#[from] k256::ecdsa::signature::Error),
    /// Elliptic curve error
    #[error(transparent)]
    EllipticCurveError(#[from] k256::elliptic_curve::Error),
    /// Error in recovering public key from signature
    #[error("public key recovery error")]
    RecoveryError,
}

/// An ECDSA signature with its recovery value, `v = recovery_id + 27`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct Ecdsa {
    /// R value
    pub r: U256,
    /// S Value
    pub s: U256,
    /// V value
    pub v: u64,
}

/// Converts a public key to the Ethereum address derived from it.
pub fn public_key_to_address(public_key: &PublicKey) -> Address {
    let point = public_key.to_encoded_point(/* compress */ false);
    // The first byte is the SEC1 tag; the address is the low 20 bytes of the
    // hash of the raw coordinates.
    let hash = keccak256(&point.as_bytes()[1..]);

    Address::from_slice(&hash[12..])
}

/// Returns the address controlled by the provided secret key.
pub fn secret_key_to_address(secret_key: &SecretKey) -> Address {
    public_key_to_address(&secret_key.public_key())
}

impl Ecdsa {
    /// Signs the provided 32-byte digest with the secret key.
    pub fn new(hash: B256, secret_key: &SecretKey) -> Result<Self, SignatureError> {
        let signing_key: SigningKey = secret_key.into();
        let (signature, recovery_id) = PrehashSigner::<(EcdsaSignature, RecoveryId)>::sign_prehash(
            &signing_key,
            hash.as_slice(),
        )?;

        Ok(Self {
            r: U256::from_be_slice(Into::<FieldBytes>::into(signature.r()).as_slice()),
            s: U256::from_be_slice(Into::<FieldBytes>::into(signature.s()).as_slice()),
            v: u64::from(Into::<u8>::into(recovery_id)) + 27,
        })
    }

    /// Reconstructs a signature from its 65-byte `r || s || v` form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SignatureError> {
        if bytes.len() != 65 {
            return Err(SignatureError::InvalidLength(bytes.len()));
        }

        let v = u64::from(bytes[64]);
        Ok(Self {
            r: U256::from_be_slice(&bytes[0..32]),
            s: U256::from_be_slice(&bytes[32..64]),
            v: if v < 27 { v + 27 } else { v },
        })
    }

    /// The signature's 65-byte `r || s || v` form, with the raw recovery id
    /// in the final byte.
    pub fn to_bytes(&self) -> [u8; 65] {
        let mut bytes = [0u8; 65];
        bytes[0..32].copy_from_slice(&self.r.to_be_bytes::<32>());
        bytes[32..64].copy_from_slice(&self.s.to_be_bytes::<32>());
        bytes[64] = (self.v - 27) as u8;

        bytes
    }

    /// Whether the signature's y-coordinate is odd.
    pub fn odd_y_parity(&self) -> bool {
        self.v == 28
    }

    /// Recovers the address that signed the provided 32-byte digest.
    pub fn recover_address(&self, hash: B256) -> Result<Address, SignatureError> {
        let standard_v = self
            .v
            .checked_sub(27)
            .filter(|id| *id < 4)
            .ok_or(SignatureError::InvalidRecoveryId(self.v))?;
        let recovery_id = RecoveryId::try_from(standard_v as u8)?;

        let mut bytes = [0u8; 64];
        bytes[0..32].copy_from_slice(&self.r.to_be_bytes::<32>());
        bytes[32..64].copy_from_slice(&self.s.to_be_bytes::<32>());
        let signature = EcdsaSignature::from_slice(&bytes)?;

        let verifying_key =
            VerifyingKey::recover_from_prehash(hash.as_slice(), &signature, recovery_id)
                .map_err(|_error| SignatureError::RecoveryError)?;

        Ok(public_key_to_address(&PublicKey::from(&verifying_key)))
    }
}

/// Recovery parity helpers shared by the typed transactions, which store the
/// y-parity bit instead of a `v` value.
pub fn parity_to_v(odd_y_parity: bool) -> u64 {
    if odd_y_parity {
        28
    } else {
        27
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> SecretKey {
        SecretKey::from_slice(
            &hex::decode("4646464646464646464646464646464646464646464646464646464646464646")
                .unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn sign_and_recover() {
        let secret_key = test_key();
        let hash = keccak256(b"message");

        let signature = Ecdsa::new(hash, &secret_key).unwrap();
        let recovered = signature.recover_address(hash).unwrap();

        assert_eq!(recovered, secret_key_to_address(&secret_key));
    }

    #[test]
    fn byte_form_round_trip() {
        let secret_key = test_key();
        let hash = keccak256(b"message");

        let signature = Ecdsa::new(hash, &secret_key).unwrap();
        let rebuilt = Ecdsa::from_bytes(&signature.to_bytes()).unwrap();

        assert_eq!(signature, rebuilt);
    }

    #[test]
    fn known_address_for_key() {
        // The address belonging to the EIP-155 example key.
        let address = secret_key_to_address(&test_key());
        assert_eq!(
            address,
            "0x9d8a62f656a8d1615c1294fd71e9cfb3e4855a4f"
                .parse::<Address>()
                .unwrap()
        );
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(matches!(
            Ecdsa::from_bytes(&[0u8; 64]),
            Err(SignatureError::InvalidLength(64))
        ));
    }
}
