//! Opcode handlers, grouped by family, plus their dynamic-gas functions.

pub mod arithmetic;
pub mod bitwise;
pub mod block;
pub mod control;
pub mod environment;
pub mod eof;
pub mod gas;
pub mod logging;
pub mod message;
pub mod stack_memory;
pub mod storage;

use ember_primitives::{Address, U256};

/// Clamps a 256-bit word to `usize`, for offsets whose out-of-range values
/// are handled by gas charging or zero-padding.
pub(crate) fn as_usize_saturated(value: U256) -> usize {
    if value > U256::from(usize::MAX) {
        usize::MAX
    } else {
        value.to::<usize>()
    }
}

/// Clamps a 256-bit word to `u64`.
pub(crate) fn as_u64_saturated(value: U256) -> u64 {
    if value > U256::from(u64::MAX) {
        u64::MAX
    } else {
        value.to::<u64>()
    }
}

/// The low 20 bytes of a word, as an address.
pub(crate) fn word_to_address(value: U256) -> Address {
    Address::from_slice(&value.to_be_bytes::<32>()[12..])
}

/// A word holding the address in its low 20 bytes.
pub(crate) fn address_to_word(address: Address) -> U256 {
    U256::from_be_slice(address.as_slice())
}

/// One for true, zero for false.
pub(crate) fn bool_to_word(value: bool) -> U256 {
    if value {
        U256::from(1u64)
    } else {
        U256::ZERO
    }
}
