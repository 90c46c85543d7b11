#![warn(missing_docs)]

//! Primitive types shared by the ember crates.
//!
//! Re-exports the `alloy` primitive types the rest of the workspace is built
//! on, and hosts the process-wide hash functions with their override hook.

use once_cell::sync::OnceCell;

pub use alloy_primitives::{
    address, b256, bytes, hex_literal,
    map::{HashMap, HashSet},
    Address, Bloom, BloomInput, Bytes, TxKind, B256, B512, B64, I256, U256, U512, U64,
};

/// Keccak-256 hash of the empty byte sequence.
pub const KECCAK_EMPTY: B256 =
    b256!("0xc5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470");

/// SHA-256 hash of the empty byte sequence.
pub const SHA256_EMPTY: B256 =
    b256!("0xe3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855");

/// A 32-byte digest function.
pub type HashFn = fn(&[u8]) -> B256;

/// Replacement hash primitives, installable once per process.
#[derive(Clone, Copy, Debug)]
pub struct CryptoHooks {
    /// Replacement for the Keccak-256 digest.
    pub keccak256: HashFn,
    /// Replacement for the SHA-256 digest.
    pub sha256: HashFn,
}

static CRYPTO_HOOKS: OnceCell<CryptoHooks> = OnceCell::new();

/// Overrides the workspace hash primitives.
///
/// # Errors
///
/// Returns the rejected hooks if a set of hooks was already installed or a
/// hash has already been computed with the defaults.
pub fn install_crypto_hooks(hooks: CryptoHooks) -> Result<(), CryptoHooks> {
    CRYPTO_HOOKS.set(hooks)
}

fn default_keccak256(data: &[u8]) -> B256 {
    use sha3::{Digest, Keccak256};

    B256::from_slice(Keccak256::digest(data).as_slice())
}

fn default_sha256(data: &[u8]) -> B256 {
    use sha2::{Digest, Sha256};

    B256::from_slice(Sha256::digest(data).as_slice())
}

fn hooks() -> &'static CryptoHooks {
    CRYPTO_HOOKS.get_or_init(|| CryptoHooks {
        keccak256: default_keccak256,
        sha256: default_sha256,
    })
}

/// Computes the Keccak-256 hash of the input.
pub fn keccak256(data: impl AsRef<[u8]>) -> B256 {
    (hooks().keccak256)(data.as_ref())
}

/// Computes the SHA-256 hash of the input.
pub fn sha256(data: impl AsRef<[u8]>) -> B256 {
    (hooks().sha256)(data.as_ref())
}
