//! Environment and account-introspection opcodes.

use ember_primitives::U256;

use super::{address_to_word, as_usize_saturated, word_to_address};
use crate::{
    evm::Evm,
    interpreter::{Control, RunState},
    result::{EvmError, ExceptionalHalt},
};

pub fn keccak256_op(state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    let [offset, len] = state.stack.pop_array()?;
    let data = state
        .memory
        .read(as_usize_saturated(offset), as_usize_saturated(len));

    let hash = ember_primitives::keccak256(data);
    state.stack.push(U256::from_be_bytes(hash.0))?;

    Ok(Control::Continue)
}

pub fn address(state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    state.stack.push(address_to_word(state.address))?;

    Ok(Control::Continue)
}

pub fn balance(state: &mut RunState, evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    let address = word_to_address(state.stack.pop()?);

    let balance = evm
        .state
        .get_account(address)?
        .map(|account| account.balance)
        .unwrap_or(U256::ZERO);
    state.stack.push(balance)?;

    Ok(Control::Continue)
}

pub fn selfbalance(state: &mut RunState, evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    let balance = evm
        .state
        .get_account(state.address)?
        .map(|account| account.balance)
        .unwrap_or(U256::ZERO);
    state.stack.push(balance)?;

    Ok(Control::Continue)
}

pub fn origin(state: &mut RunState, evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    state.stack.push(address_to_word(evm.tx.origin))?;

    Ok(Control::Continue)
}

pub fn caller(state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    state.stack.push(address_to_word(state.caller))?;

    Ok(Control::Continue)
}

pub fn callvalue(state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    state.stack.push(state.value)?;

    Ok(Control::Continue)
}

pub fn calldataload(state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    let offset = as_usize_saturated(state.stack.pop()?);

    let mut word = [0u8; 32];
    if offset < state.input.len() {
        let available = (state.input.len() - offset).min(32);
        word[..available].copy_from_slice(&state.input[offset..offset + available]);
    }
    state.stack.push(U256::from_be_bytes(word))?;

    Ok(Control::Continue)
}

pub fn calldatasize(state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    state.stack.push(U256::from(state.input.len()))?;

    Ok(Control::Continue)
}

/// Copies `src[offset..offset + len]` into memory at `dest`, zero-padding
/// reads past the end of the source.
fn copy_with_padding(state: &mut RunState, dest: usize, offset: usize, len: usize, src: &[u8]) {
    if len == 0 {
        return;
    }

    let mut data = vec![0u8; len];
    if offset < src.len() {
        let available = (src.len() - offset).min(len);
        data[..available].copy_from_slice(&src[offset..offset + available]);
    }
    state.memory.write(dest, &data);
}

pub fn calldatacopy(state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    let [dest, offset, len] = state.stack.pop_array()?;

    let input = state.input.clone();
    copy_with_padding(
        state,
        as_usize_saturated(dest),
        as_usize_saturated(offset),
        as_usize_saturated(len),
        &input,
    );

    Ok(Control::Continue)
}

pub fn codesize(state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    state.stack.push(U256::from(state.code.len()))?;

    Ok(Control::Continue)
}

pub fn codecopy(state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    let [dest, offset, len] = state.stack.pop_array()?;

    let code = state.code.clone();
    copy_with_padding(
        state,
        as_usize_saturated(dest),
        as_usize_saturated(offset),
        as_usize_saturated(len),
        &code,
    );

    Ok(Control::Continue)
}

pub fn gasprice(state: &mut RunState, evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    state.stack.push(U256::from(evm.tx.gas_price))?;

    Ok(Control::Continue)
}

pub fn extcodesize(state: &mut RunState, evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    let address = word_to_address(state.stack.pop()?);
    let code = evm.state.get_code(address)?;
    state.stack.push(U256::from(code.len()))?;

    Ok(Control::Continue)
}

pub fn extcodecopy(state: &mut RunState, evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    let [address, dest, offset, len] = state.stack.pop_array()?;

    let code = evm.state.get_code(word_to_address(address))?;
    copy_with_padding(
        state,
        as_usize_saturated(dest),
        as_usize_saturated(offset),
        as_usize_saturated(len),
        &code,
    );

    Ok(Control::Continue)
}

pub fn extcodehash(state: &mut RunState, evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    let address = word_to_address(state.stack.pop()?);

    // Nonexistent and empty accounts hash to zero.
    let hash = match evm.state.get_account(address)? {
        Some(account) if !account.is_empty() => U256::from_be_bytes(account.code_hash.0),
        _ => U256::ZERO,
    };
    state.stack.push(hash)?;

    Ok(Control::Continue)
}

pub fn returndatasize(state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    state.stack.push(U256::from(state.return_bytes.len()))?;

    Ok(Control::Continue)
}

pub fn returndatacopy(state: &mut RunState, _evm: &mut Evm<'_>) -> Result<Control, EvmError> {
    let [dest, offset, len] = state.stack.pop_array()?;
    let offset = as_usize_saturated(offset);
    let len = as_usize_saturated(len);

    // Unlike the other copies, reading past the return buffer halts.
    if offset.checked_add(len).is_none_or(|end| end > state.return_bytes.len()) {
        return Err(ExceptionalHalt::ReturnDataOutOfBounds.into());
    }

    let data = state.return_bytes.clone();
    copy_with_padding(state, as_usize_saturated(dest), offset, len, &data);

    Ok(Control::Continue)
}

pub use keccak256_op as keccak256;

#[cfg(test)]
mod tests {
    use ember_primitives::KECCAK_EMPTY;

    use super::*;
    use crate::{opcode, test_support::run_code};

    #[test]
    fn keccak256_of_empty_input() {
        // PUSH1 0, PUSH1 0, KECCAK256
        let (stack, _gas) = run_code(&[0x60, 0x00, 0x60, 0x00, opcode::KECCAK256, 0x00], 100_000);
        assert_eq!(stack, vec![U256::from_be_bytes(KECCAK_EMPTY.0)]);
    }

    #[test]
    fn calldataload_pads_with_zeros() {
        let (stack, _gas) = crate::test_support::run_code_with(
            &[0x60, 0x00, opcode::CALLDATALOAD, 0x00],
            100_000,
            ember_forks::Hardfork::Berlin,
            |setup| {
                setup.input = vec![0xaa, 0xbb].into();
            },
        );

        let mut expected = [0u8; 32];
        expected[0] = 0xaa;
        expected[1] = 0xbb;
        assert_eq!(stack, vec![U256::from_be_bytes(expected)]);
    }

    #[test]
    fn codecopy_pads_past_code_end() {
        // PUSH1 4 (len), PUSH1 0 (offset), PUSH1 0 (dest), CODECOPY, then
        // MLOAD of word 0.
        let code = [0x60, 0x04, 0x60, 0x00, 0x60, 0x00, opcode::CODECOPY, 0x00];
        let (_stack, gas) = run_code(&code, 100_000);

        // Three pushes, one copy of one word with one word of expansion.
        assert_eq!(gas, 3 + 3 + 3 + 3 + 3 + 3);
    }
}
