//! Block-context opcodes.

use ember_forks::Hardfork;
use ember_primitives::U256;

use super::{address_to_word, as_usize_saturated};
use crate::{
    evm::Evm,
    interpreter::{Control, RunState},
    result::EvmError,
};

/// Number of ancestor hashes `BLOCKHASH` can reach.
const BLOCKHASH_WINDOW: u64 = 256;

pub fn blockhash(state: &mut RunState, evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    let number = state.stack.pop()?;

    let requested = if number > U256::from(u64::MAX) {
        None
    } else {
        Some(number.to::<u64>())
    };

    let hash = match requested {
        Some(requested)
            if requested < evm.block.number
                && requested + BLOCKHASH_WINDOW >= evm.block.number =>
        {
            evm.state.block_hash(requested)?
        }
        _ => Default::default(),
    };
    state.stack.push(U256::from_be_bytes(hash.0))?;

    Ok(Control::Continue)
}

pub fn coinbase(state: &mut RunState, evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    state.stack.push(address_to_word(evm.block.coinbase))?;

    Ok(Control::Continue)
}

pub fn timestamp(state: &mut RunState, evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    state.stack.push(U256::from(evm.block.timestamp))?;

    Ok(Control::Continue)
}

pub fn number(state: &mut RunState, evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    state.stack.push(U256::from(evm.block.number))?;

    Ok(Control::Continue)
}

/// `DIFFICULTY` before the merge, `PREVRANDAO` after: the handler inspects
/// the hardfork and returns the block difficulty or the randomness beacon.
pub fn difficulty(state: &mut RunState, evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    let value = if evm.hardfork >= Hardfork::Merge {
        U256::from_be_bytes(evm.block.prevrandao.0)
    } else {
        evm.block.difficulty
    };
    state.stack.push(value)?;

    Ok(Control::Continue)
}

pub fn gaslimit(state: &mut RunState, evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    state.stack.push(U256::from(evm.block.gas_limit))?;

    Ok(Control::Continue)
}

pub fn chainid(state: &mut RunState, evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    state.stack.push(U256::from(evm.cfg.chain_id))?;

    Ok(Control::Continue)
}

pub fn basefee(state: &mut RunState, evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    state.stack.push(U256::from(evm.block.base_fee))?;

    Ok(Control::Continue)
}

pub fn blobhash(state: &mut RunState, evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    let index = as_usize_saturated(state.stack.pop()?);

    let hash = evm
        .tx
        .blob_hashes
        .get(index)
        .map(|hash| U256::from_be_bytes(hash.0))
        .unwrap_or(U256::ZERO);
    state.stack.push(hash)?;

    Ok(Control::Continue)
}

pub fn blobbasefee(state: &mut RunState, evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    state.stack.push(U256::from(evm.block.blob_gas_price))?;

    Ok(Control::Continue)
}

#[cfg(test)]
mod tests {
    use ember_forks::Hardfork;
    use ember_primitives::B256;

    use crate::{opcode, test_support::{run_code_at, run_code_with}};

    use super::*;

    #[test]
    fn prevrandao_toggles_at_merge() {
        let prevrandao = B256::repeat_byte(0x17);

        let (stack, _gas) = run_code_with(
            &[opcode::DIFFICULTY, 0x00],
            100_000,
            Hardfork::GrayGlacier,
            |setup| {
                setup.block.difficulty = U256::from(1234u64);
                setup.block.prevrandao = prevrandao;
            },
        );
        assert_eq!(stack, vec![U256::from(1234u64)]);

        let (stack, _gas) = run_code_with(
            &[opcode::DIFFICULTY, 0x00],
            100_000,
            Hardfork::Merge,
            |setup| {
                setup.block.difficulty = U256::from(1234u64);
                setup.block.prevrandao = prevrandao;
            },
        );
        assert_eq!(stack, vec![U256::from_be_bytes(prevrandao.0)]);
    }

    #[test]
    fn blobhash_out_of_range_is_zero() {
        let hash = B256::repeat_byte(0x01);

        let (stack, _gas) = run_code_with(
            &[0x60, 0x00, opcode::BLOBHASH, 0x60, 0x01, opcode::BLOBHASH, 0x00],
            100_000,
            Hardfork::Cancun,
            |setup| {
                setup.tx.blob_hashes = vec![hash];
            },
        );
        assert_eq!(
            stack,
            vec![U256::from_be_bytes(hash.0), U256::ZERO]
        );
    }

    #[test]
    fn blockhash_window() {
        let hash = B256::repeat_byte(0xbb);

        let (stack, _gas) = run_code_with(
            &[0x60, 0x64, opcode::BLOCKHASH, 0x00],
            100_000,
            Hardfork::Berlin,
            |setup| {
                setup.block.number = 0x65;
                setup.state.insert_block_hash(0x64, hash);
            },
        );
        assert_eq!(stack, vec![U256::from_be_bytes(hash.0)]);

        // Out of the 256-ancestor window.
        let (stack, _gas) = run_code_with(
            &[0x60, 0x01, opcode::BLOCKHASH, 0x00],
            100_000,
            Hardfork::Berlin,
            |setup| {
                setup.block.number = 0x200;
            },
        );
        assert_eq!(stack, vec![U256::ZERO]);
    }

    #[test]
    fn chainid_reports_configuration() {
        let (stack, _gas) = run_code_at(&[opcode::CHAINID, 0x00], 100_000, Hardfork::Istanbul);
        assert_eq!(stack, vec![U256::from(1u64)]);
    }
}
