//! Stack manipulation and memory opcodes.

use ember_primitives::U256;

use super::as_usize_saturated;
use crate::{
    evm::Evm,
    interpreter::{Control, RunState},
    opcode,
    result::EvmError,
};

pub fn pop(state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    state.stack.pop()?;

    Ok(Control::Continue)
}

pub fn mload(state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    let offset = as_usize_saturated(state.stack.pop()?);
    let word = state.memory.read_word(offset);
    state.stack.push(word)?;

    Ok(Control::Continue)
}

pub fn mstore(state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    let [offset, value] = state.stack.pop_array()?;
    state.memory.write_word(as_usize_saturated(offset), value);

    Ok(Control::Continue)
}

pub fn mstore8(state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    let [offset, value] = state.stack.pop_array()?;
    state
        .memory
        .write_byte(as_usize_saturated(offset), value.to_be_bytes::<32>()[31]);

    Ok(Control::Continue)
}

pub fn mcopy(state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    let [dest, src, len] = state.stack.pop_array()?;
    state.memory.copy_within(
        as_usize_saturated(dest),
        as_usize_saturated(src),
        as_usize_saturated(len),
    );

    Ok(Control::Continue)
}

pub fn pc(state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    // The counter has already advanced past the opcode.
    state.stack.push(U256::from(state.pc - 1))?;

    Ok(Control::Continue)
}

pub fn msize(state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    state.stack.push(U256::from(state.memory.len()))?;

    Ok(Control::Continue)
}

pub fn gas(state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    state.stack.push(U256::from(state.gas_left))?;

    Ok(Control::Continue)
}

pub fn push0(state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    state.stack.push(U256::ZERO)?;

    Ok(Control::Continue)
}

pub fn push(state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    let op = state.code[state.pc - 1];
    let len = usize::from(op - opcode::PUSH1) + 1;

    let immediate = state.immediate(len);
    state.stack.push(U256::from_be_slice(&immediate))?;
    state.pc += len;

    Ok(Control::Continue)
}

pub fn dup(state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    let op = state.code[state.pc - 1];
    let n = usize::from(op - opcode::DUP1) + 1;
    state.stack.dup(n)?;

    Ok(Control::Continue)
}

pub fn swap(state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    let op = state.code[state.pc - 1];
    let n = usize::from(op - opcode::SWAP1) + 1;
    state.stack.swap(n)?;

    Ok(Control::Continue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::run_code;

    #[test]
    fn push_reads_immediates() {
        // PUSH2 0x0102, PUSH1 0x03
        let (stack, _gas) = run_code(&[0x61, 0x01, 0x02, 0x60, 0x03, 0x00], 100_000);
        assert_eq!(stack, vec![U256::from(0x0102u64), U256::from(3u64)]);
    }

    #[test]
    fn push_at_code_end_is_zero_padded() {
        // PUSH2 with a single trailing byte.
        let (stack, _gas) = run_code(&[0x61, 0x01], 100_000);
        assert_eq!(stack, vec![U256::from(0x0100u64)]);
    }

    #[test]
    fn mstore_mload_round_trip() {
        // PUSH1 0x2a, PUSH1 0, MSTORE, PUSH1 0, MLOAD
        let code = [
            0x60, 0x2a, 0x60, 0x00, opcode::MSTORE, 0x60, 0x00, opcode::MLOAD, 0x00,
        ];
        let (stack, _gas) = run_code(&code, 100_000);
        assert_eq!(stack, vec![U256::from(0x2au64)]);
    }

    #[test]
    fn msize_tracks_touched_words() {
        // MSTORE8 at offset 32 touches two words.
        let code = [0x60, 0x01, 0x60, 0x20, opcode::MSTORE8, opcode::MSIZE, 0x00];
        let (stack, _gas) = run_code(&code, 100_000);
        assert_eq!(stack, vec![U256::from(64u64)]);
    }

    #[test]
    fn gas_reports_remaining_after_charge() {
        // GAS costs 2 itself.
        let (stack, _gas) = run_code(&[opcode::GAS, 0x00], 100_000);
        assert_eq!(stack, vec![U256::from(99_998u64)]);
    }

    #[test]
    fn dup_and_swap_by_opcode() {
        // PUSH1 1, PUSH1 2, DUP2, SWAP1
        let code = [0x60, 0x01, 0x60, 0x02, 0x81, 0x90, 0x00];
        let (stack, _gas) = run_code(&code, 100_000);
        assert_eq!(
            stack,
            vec![U256::from(1u64), U256::from(1u64), U256::from(2u64)]
        );
    }
}
