//! The precompile dispatch shell.
//!
//! The table maps fixed low addresses to native functions; the address sets
//! follow the hardfork schedule so pre-warming and existence checks stay
//! accurate. The hashing and recovery precompiles ship implemented; the
//! remaining algorithms are injectable externals. Calling an active address
//! without an installed function behaves like a call to empty code.

use ember_forks::Hardfork;
use ember_primitives::{keccak256, sha256, Address, Bytes, HashMap, B256, U256};
use k256::{
    ecdsa::{RecoveryId, Signature as EcdsaSignature, VerifyingKey},
    elliptic_curve::sec1::ToEncodedPoint as _,
};

/// The output of a successful precompile run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrecompileOutput {
    /// Gas consumed by the run.
    pub gas_used: u64,
    /// The returned bytes.
    pub output: Bytes,
}

/// A failed precompile run. Failures consume the full gas budget.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PrecompileError {
    /// The budget cannot cover the input.
    #[error("out of gas")]
    OutOfGas,
    /// The input was rejected.
    #[error("invalid precompile input: {0}")]
    InvalidInput(&'static str),
}

/// A native function behind a precompile address.
pub type PrecompileFn = fn(&[u8], u64) -> Result<PrecompileOutput, PrecompileError>;

const fn precompile_address(low: u8) -> Address {
    Address::with_last_byte(low)
}

/// The address-keyed dispatch table active for one hardfork.
#[derive(Clone, Debug)]
pub struct Precompiles {
    addresses: Vec<Address>,
    table: HashMap<Address, PrecompileFn>,
}

impl Precompiles {
    /// The table for the provided hardfork.
    pub fn for_hardfork(hardfork: Hardfork) -> Self {
        let count: u8 = if hardfork >= Hardfork::Prague {
            0x11
        } else if hardfork >= Hardfork::Cancun {
            0x0a
        } else if hardfork >= Hardfork::Istanbul {
            0x09
        } else if hardfork >= Hardfork::Byzantium {
            0x08
        } else {
            0x04
        };

        let addresses: Vec<Address> = (1..=count).map(precompile_address).collect();

        let mut table: HashMap<Address, PrecompileFn> = HashMap::default();
        table.insert(precompile_address(0x01), ecrecover as PrecompileFn);
        table.insert(precompile_address(0x02), sha256_run as PrecompileFn);
        table.insert(precompile_address(0x04), identity as PrecompileFn);

        Self { addresses, table }
    }

    /// The active precompile addresses, for transaction pre-warming.
    pub fn addresses(&self) -> &[Address] {
        &self.addresses
    }

    /// Whether the address hosts an active precompile.
    pub fn contains(&self, address: Address) -> bool {
        self.addresses.contains(&address)
    }

    /// The installed function at the address, if any.
    pub fn get(&self, address: Address) -> Option<PrecompileFn> {
        if !self.contains(address) {
            return None;
        }

        self.table.get(&address).copied()
    }

    /// Installs or replaces the function at an address. The address joins
    /// the active set.
    pub fn install(&mut self, address: Address, run: PrecompileFn) {
        if !self.addresses.contains(&address) {
            self.addresses.push(address);
        }
        self.table.insert(address, run);
    }
}

fn word_count(len: usize) -> u64 {
    (len as u64).div_ceil(32)
}

fn charge(gas_limit: u64, cost: u64) -> Result<u64, PrecompileError> {
    if cost > gas_limit {
        return Err(PrecompileError::OutOfGas);
    }

    Ok(cost)
}

/// `0x01`: secp256k1 public-key recovery over a 32-byte digest.
fn ecrecover(input: &[u8], gas_limit: u64) -> Result<PrecompileOutput, PrecompileError> {
    const ECRECOVER_GAS: u64 = 3000;

    let gas_used = charge(gas_limit, ECRECOVER_GAS)?;

    let mut padded = [0u8; 128];
    let len = input.len().min(128);
    padded[..len].copy_from_slice(&input[..len]);

    let hash = B256::from_slice(&padded[0..32]);
    let v = U256::from_be_slice(&padded[32..64]);
    let signature = &padded[64..128];

    // Malformed signatures recover to nothing rather than failing the call.
    let recovered = recover_address(hash, v, signature);
    let output = match recovered {
        Some(address) => {
            let mut word = [0u8; 32];
            word[12..].copy_from_slice(address.as_slice());
            Bytes::copy_from_slice(&word)
        }
        None => Bytes::new(),
    };

    Ok(PrecompileOutput { gas_used, output })
}

fn recover_address(hash: B256, v: U256, signature: &[u8]) -> Option<Address> {
    if v != U256::from(27u64) && v != U256::from(28u64) {
        return None;
    }
    let recovery_id = RecoveryId::from_byte((v.to::<u64>() - 27) as u8)?;

    let signature = EcdsaSignature::from_slice(signature).ok()?;
    let verifying_key =
        VerifyingKey::recover_from_prehash(hash.as_slice(), &signature, recovery_id).ok()?;

    let point = verifying_key.to_encoded_point(/* compress */ false);
    let digest = keccak256(&point.as_bytes()[1..]);

    Some(Address::from_slice(&digest[12..]))
}

/// `0x02`: SHA-256.
fn sha256_run(input: &[u8], gas_limit: u64) -> Result<PrecompileOutput, PrecompileError> {
    const SHA256_GAS: u64 = 60;
    const SHA256_WORD_GAS: u64 = 12;

    let gas_used = charge(gas_limit, SHA256_GAS + SHA256_WORD_GAS * word_count(input.len()))?;

    Ok(PrecompileOutput {
        gas_used,
        output: Bytes::copy_from_slice(sha256(input).as_slice()),
    })
}

/// `0x04`: the identity function.
fn identity(input: &[u8], gas_limit: u64) -> Result<PrecompileOutput, PrecompileError> {
    const IDENTITY_GAS: u64 = 15;
    const IDENTITY_WORD_GAS: u64 = 3;

    let gas_used = charge(
        gas_limit,
        IDENTITY_GAS + IDENTITY_WORD_GAS * word_count(input.len()),
    )?;

    Ok(PrecompileOutput {
        gas_used,
        output: Bytes::copy_from_slice(input),
    })
}
