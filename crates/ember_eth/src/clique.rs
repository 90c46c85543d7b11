//! Clique proof-of-authority seals.
//!
//! A clique header keeps a 32-byte vanity prefix and a 65-byte secp256k1
//! seal inside `extraData`. The seal signs the hash of the header's RLP with
//! the seal bytes removed.

use ember_primitives::{keccak256, Address, Bytes, B256};
use k256::SecretKey;

use crate::{
    header::{BlockConfig, FrozenHeader, Header, HeaderData},
    signature::{Ecdsa, SignatureError},
    HeaderValidationError,
};

/// Length of the vanity prefix of clique extra data.
pub const CLIQUE_EXTRA_VANITY: usize = 32;
/// Length of the seal suffix of clique extra data.
pub const CLIQUE_EXTRA_SEAL: usize = 65;

/// An error involving a clique seal.
#[derive(Debug, thiserror::Error)]
pub enum CliqueError {
    /// The header's extra data cannot hold the vanity prefix and the seal.
    #[error("clique extra data too short: {0} bytes")]
    ExtraDataTooShort(usize),
    /// The seal failed to sign or recover.
    #[error(transparent)]
    Signature(#[from] SignatureError),
    /// The sealed header failed validation.
    #[error(transparent)]
    Validation(#[from] HeaderValidationError),
}

/// The digest a clique seal commits to: the header's RLP with the seal
/// region zeroed out of `extraData`.
pub fn clique_sig_hash(header: &Header) -> Result<B256, CliqueError> {
    let extra_data = &header.extra_data;
    if extra_data.len() < CLIQUE_EXTRA_VANITY + CLIQUE_EXTRA_SEAL {
        return Err(CliqueError::ExtraDataTooShort(extra_data.len()));
    }

    let unsealed = Header {
        extra_data: Bytes::copy_from_slice(&extra_data[..extra_data.len() - CLIQUE_EXTRA_SEAL]),
        ..header.clone()
    };

    Ok(keccak256(alloy_rlp::encode(&unsealed)))
}

/// Recovers the address that sealed the provided clique header.
pub fn clique_signer(header: &Header) -> Result<Address, CliqueError> {
    let extra_data = &header.extra_data;
    if extra_data.len() < CLIQUE_EXTRA_VANITY + CLIQUE_EXTRA_SEAL {
        return Err(CliqueError::ExtraDataTooShort(extra_data.len()));
    }

    let seal = &extra_data[extra_data.len() - CLIQUE_EXTRA_SEAL..];
    let signature = Ecdsa::from_bytes(seal)?;

    Ok(signature.recover_address(clique_sig_hash(header)?)?)
}

/// Builds and seals a clique header: `extraData` becomes the 32-byte vanity
/// followed by the signer's 65-byte seal.
pub fn seal_clique_header(
    data: HeaderData,
    config: &BlockConfig<'_>,
    vanity: &[u8],
    secret_key: &SecretKey,
) -> Result<FrozenHeader, CliqueError> {
    let mut padded_vanity = [0u8; CLIQUE_EXTRA_VANITY];
    let len = vanity.len().min(CLIQUE_EXTRA_VANITY);
    padded_vanity[..len].copy_from_slice(&vanity[..len]);

    let mut extra_data = Vec::with_capacity(CLIQUE_EXTRA_VANITY + CLIQUE_EXTRA_SEAL);
    extra_data.extend_from_slice(&padded_vanity);
    extra_data.extend_from_slice(&[0u8; CLIQUE_EXTRA_SEAL]);

    let mut header = data.into_header(config);
    header.extra_data = extra_data.into();

    let signature = Ecdsa::new(clique_sig_hash(&header)?, secret_key)?;

    let mut extra_data = header.extra_data.to_vec();
    extra_data[CLIQUE_EXTRA_VANITY..].copy_from_slice(&signature.to_bytes());
    header.extra_data = extra_data.into();

    Ok(FrozenHeader::freeze(header))
}
